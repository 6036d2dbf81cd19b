use nom::bytes::complete::{tag, take};
use nom::combinator::{all_consuming, map, verify};
use nom::number::complete::u8;
use nom::sequence::tuple;
use nom::IResult;

use crate::decode::{FaultLogEntry, FilterCycle, FilterSettings, FILTER2_ENABLED, FILTER2_HOUR};
use crate::framer::RawFrame;
use crate::MARKER;

type Buf = [u8];

const MARKER_TAG: &Buf = &[MARKER];

// length, source, destination, opcode and checksum
const MIN_LEN: usize = 5;

/// The fields of a received frame, borrowed from a [`RawFrame`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Frame<'a> {
    pub source: u8,
    pub destination: u8,
    pub opcode: u8,
    pub payload: &'a [u8],
    pub checksum: u8,
}

impl<'a> Frame<'a> {
    /// Split a raw frame into its fields. Returns `None` for frames too
    /// short to carry a header.
    pub fn parse(raw: &'a RawFrame) -> Option<Self> {
        envelope(raw.as_bytes()).ok().map(|(_, frame)| frame)
    }
}

fn envelope(buf: &Buf) -> IResult<&Buf, Frame<'_>> {
    let (buf, _) = tag(MARKER_TAG)(buf)?;
    let (buf, len) = verify(u8, |len: &u8| usize::from(*len) >= MIN_LEN)(buf)?;
    let (buf, (source, destination, opcode)) = tuple((u8, u8, u8))(buf)?;
    let (buf, payload) = take(usize::from(len) - MIN_LEN)(buf)?;
    let (buf, checksum) = u8(buf)?;
    let (buf, _) = all_consuming(tag(MARKER_TAG))(buf)?;
    Ok((
        buf,
        Frame {
            source,
            destination,
            opcode,
            payload,
            checksum,
        },
    ))
}

pub(crate) fn fault_log(payload: &Buf) -> IResult<&Buf, FaultLogEntry> {
    map(
        tuple((u8, u8, u8, u8, u8, u8)),
        |(total_entries, current_entry, code, days_ago, hour, minute)| FaultLogEntry {
            total_entries,
            current_entry,
            code,
            days_ago,
            hour,
            minute,
        },
    )(payload)
}

// start hour, start minute, duration hours, duration minutes
fn filter_window(buf: &Buf) -> IResult<&Buf, (u8, u8, u8, u8)> {
    tuple((u8, u8, u8, u8))(buf)
}

pub(crate) fn filter_settings(payload: &Buf) -> IResult<&Buf, FilterSettings> {
    let (buf, (hour, minute, duration_hours, duration_minutes)) = filter_window(payload)?;
    let filter1 = FilterCycle {
        enabled: true,
        start_hour: hour,
        start_minute: minute,
        duration_hours,
        duration_minutes,
    };

    // The second cycle's enable flag lives in the top bit of its start hour.
    let (buf, (packed_hour, minute, duration_hours, duration_minutes)) = filter_window(buf)?;
    let packed = [packed_hour];
    let filter2 = FilterCycle {
        enabled: FILTER2_ENABLED.flag(&packed).unwrap_or(false),
        start_hour: FILTER2_HOUR.get(&packed).unwrap_or(0),
        start_minute: minute,
        duration_hours,
        duration_minutes,
    };
    Ok((buf, FilterSettings { filter1, filter2 }))
}
