//! See [`Client`] for more details.

use std::time::Instant;

use log::{debug, info, trace, warn};
use snafu::{ensure, OptionExt, ResultExt, Snafu};

use crate::command::{Command, Toggle};
use crate::decode::{self, FaultLogEntry, FilterSettings, SpaConfig, SpaState};
use crate::encoder::OutFrame;
use crate::framer::{FrameAssembler, RawFrame};
use crate::liveness::LivenessMonitor;
use crate::nom_parser::Frame;
use crate::settings::Settings;
use crate::temperature::{self, Scales};
use crate::types::{ClientId, ClockFormat, Error as TypeError, Hour, Minute, TempScale};
use crate::{address, opcode};

/// Payload of the identity request broadcast.
const ID_REQUEST: [u8; 3] = [0x02, 0xF1, 0x73];

/// Payloads of the data request message.
const CONFIG_REQUEST: [u8; 3] = [0x00, 0x00, 0x01];
const FAULT_LOG_REQUEST: [u8; 3] = [0x20, 0xFF, 0x00];
const FILTER_SETTINGS_REQUEST: [u8; 3] = [0x01, 0x00, 0x00];

/// Errors returned by the command methods of [`Client`].
#[derive(Debug, Snafu, PartialEq)]
#[non_exhaustive]
pub enum CommandError {
    /// The set-point is outside the range accepted for the display scale.
    #[snafu(display("Temperature {}{} is out of range", temperature, scale))]
    TemperatureOutOfRange { temperature: f32, scale: TempScale },
    /// The spa's scale hasn't been learned or configured yet.
    #[snafu(display("Spa temperature scale is not known yet"))]
    NativeScaleUnknown,
    #[snafu(display("Display temperature scale is not set"))]
    DisplayScaleUnknown,
    #[snafu(display("Invalid clock value: {}", source))]
    Clock { source: TypeError },
}

/// Our identity on the bus.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Registration {
    Unregistered,
    Registered(ClientId),
}

/// Progress of one of the data requests made after registering.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum RequestStatus {
    #[default]
    NotRequested,
    Requested,
    Received,
}

/// Which of the one-shot data requests have been made and answered.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct AcquisitionProgress {
    pub config: RequestStatus,
    pub fault_log: RequestStatus,
    pub filter_settings: RequestStatus,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum PayloadKind {
    Status,
    Config,
    FaultLog,
    FilterSettings,
}

/// Checksums of the last decoded frame per payload kind. The spa repeats
/// its broadcasts, identical frames are only decoded once.
#[derive(Debug, Clone, Default)]
struct LastChecksums([Option<u8>; 4]);

impl LastChecksums {
    fn is_new(&self, kind: PayloadKind, checksum: u8) -> bool {
        self.0[kind as usize] != Some(checksum)
    }

    fn record(&mut self, kind: PayloadKind, checksum: u8) {
        self.0[kind as usize] = Some(checksum);
    }

    fn forget(&mut self, kind: PayloadKind) {
        self.0[kind as usize] = None;
    }
}

/// Sans-io Balboa bus client.
///
/// Feed every received byte to [`receive_byte()`](Self::receive_byte). When
/// it returns a frame, write that frame to the bus before feeding more bytes.
/// Call [`check_liveness()`](Self::check_liveness) periodically.
///
/// # Example
///
/// ```
/// use std::time::Instant;
/// use balboa_proto::{Client, ClientId, Registration, Settings};
///
/// let now = Instant::now();
/// let mut client = Client::new(Settings::default(), now);
///
/// // the spa assigns id 7 to the new client
/// let assign = [0x7E, 0x06, 0xFE, 0xBF, 0x02, 0x07, 0xD8, 0x7E];
/// let mut reply = None;
/// for byte in assign.iter() {
///     reply = reply.or(client.receive_byte(*byte, now));
/// }
/// assert_eq!(client.registration(), Registration::Registered(ClientId::new(7).unwrap()));
/// // which we acknowledge
/// assert_eq!(reply.unwrap().as_bytes(), &[0x7E, 0x05, 0x07, 0xBF, 0x03, 0xF3, 0x7E]);
/// ```
#[derive(Debug)]
pub struct Client {
    assembler: FrameAssembler,
    registration: Registration,
    progress: AcquisitionProgress,
    pending: Option<Command>,
    scales: Scales,
    state: SpaState,
    config: Option<SpaConfig>,
    fault_log: Option<FaultLogEntry>,
    filter_settings: Option<FilterSettings>,
    last_checksums: LastChecksums,
    liveness: LivenessMonitor,
}

impl Client {
    pub fn new(settings: Settings, now: Instant) -> Self {
        Self {
            assembler: FrameAssembler::new(),
            registration: Registration::Unregistered,
            progress: AcquisitionProgress::default(),
            pending: None,
            scales: Scales {
                native: settings.native_scale,
                display: settings.display_scale,
            },
            state: SpaState::default(),
            config: None,
            fault_log: None,
            filter_settings: None,
            last_checksums: LastChecksums::default(),
            liveness: LivenessMonitor::new(settings.liveness_timeout, now),
        }
    }

    /// Feed one byte received from the bus.
    ///
    /// Returns the frame to transmit if the byte completed a frame that
    /// requires an answer.
    pub fn receive_byte(&mut self, byte: u8, now: Instant) -> Option<OutFrame> {
        let raw = self.assembler.feed(byte)?;
        self.receive_frame(&raw, now)
    }

    /// Process a complete, checksum-valid frame.
    pub fn receive_frame(&mut self, raw: &RawFrame, now: Instant) -> Option<OutFrame> {
        if self.liveness.frame_received(now) {
            info!("Communication with the spa restored");
        }
        trace!("RX {:02X?}", raw.as_bytes());

        let frame = match Frame::parse(raw) {
            Some(frame) => frame,
            None => {
                debug!("Frame too short for a header: {:02X?}", raw.as_bytes());
                return None;
            }
        };
        self.route(&frame)
    }

    /// Check for a silent bus. Once no valid frame was received for the
    /// liveness timeout, the registration is dropped and this returns false
    /// until the next valid frame.
    pub fn check_liveness(&mut self, now: Instant) -> bool {
        let was_lost = self.liveness.is_lost();
        if !self.liveness.check(now) {
            return true;
        }
        if !was_lost {
            warn!(
                "No valid frame for {} seconds, marking spa as dead",
                self.liveness.silence(now).as_secs()
            );
        }
        self.registration = Registration::Unregistered;
        false
    }

    fn route(&mut self, frame: &Frame<'_>) -> Option<OutFrame> {
        match self.registration {
            Registration::Unregistered => {
                if frame.source == address::REGISTRATION
                    && frame.destination == address::CLIENT_CLASS
                {
                    match frame.opcode {
                        opcode::ASSIGN_ID => return self.assign_id(frame),
                        opcode::NEW_CLIENT_POLL => {
                            debug!("Requesting client id");
                            return OutFrame::try_new(
                                address::REGISTRATION,
                                address::CLIENT_CLASS,
                                opcode::ID_REQUEST,
                                &ID_REQUEST,
                            );
                        }
                        _ => {}
                    }
                }
            }
            Registration::Registered(id) => {
                if frame.source == *id && frame.opcode == opcode::CLEAR_TO_SEND {
                    return Some(self.clear_to_send(id));
                }
            }
        }

        let own = matches!(self.registration, Registration::Registered(id) if *id == frame.source);
        match frame.opcode {
            opcode::STATUS if frame.source == address::BROADCAST => self.decode_status(frame),
            opcode::CONFIGURATION if own => self.decode_config(frame),
            opcode::FAULT_LOG if own => self.decode_fault_log(frame),
            opcode::FILTER_SETTINGS if own => self.decode_filter_settings(frame),
            _ => trace!(
                "Ignoring opcode 0x{:02X} from 0x{:02X}",
                frame.opcode,
                frame.source
            ),
        }
        None
    }

    fn assign_id(&mut self, frame: &Frame<'_>) -> Option<OutFrame> {
        let proposed = *frame.payload.first()?;
        let id = ClientId::clamped(proposed)?;
        info!("Got client id {}, acknowledging", id);

        self.registration = Registration::Registered(id);
        self.progress = AcquisitionProgress::default();
        self.last_checksums.forget(PayloadKind::Config);
        self.last_checksums.forget(PayloadKind::FaultLog);
        self.last_checksums.forget(PayloadKind::FilterSettings);
        Some(OutFrame::from_client(id, opcode::ID_ACK, &[]))
    }

    /// We may send exactly one frame: a pending command, a data request, or
    /// "nothing to send".
    fn clear_to_send(&mut self, id: ClientId) -> OutFrame {
        match self.pending.take() {
            Some(command) => {
                debug!("Sending {:?}", command);
                command.to_frame(id)
            }
            None => self.bootstrap_request(id),
        }
    }

    fn bootstrap_request(&mut self, id: ClientId) -> OutFrame {
        use RequestStatus::*;

        let progress = &mut self.progress;
        if progress.config == NotRequested {
            debug!("Requesting configuration");
            progress.config = Requested;
            OutFrame::from_client(id, opcode::DATA_REQUEST, &CONFIG_REQUEST)
        } else if progress.fault_log == NotRequested {
            debug!("Requesting fault log");
            progress.fault_log = Requested;
            OutFrame::from_client(id, opcode::DATA_REQUEST, &FAULT_LOG_REQUEST)
        } else if progress.fault_log == Received && progress.filter_settings == NotRequested {
            debug!("Requesting filter settings");
            progress.filter_settings = Requested;
            OutFrame::from_client(id, opcode::DATA_REQUEST, &FILTER_SETTINGS_REQUEST)
        } else {
            OutFrame::from_client(id, opcode::NOTHING_TO_SEND, &[])
        }
    }

    fn decode_status(&mut self, frame: &Frame<'_>) {
        if !self.last_checksums.is_new(PayloadKind::Status, frame.checksum) {
            return;
        }
        if let Some(state) = decode::decode_status(frame.payload, self.scales, &self.state) {
            self.state = state;
            self.last_checksums.record(PayloadKind::Status, frame.checksum);
        }
    }

    fn decode_config(&mut self, frame: &Frame<'_>) {
        if !self.last_checksums.is_new(PayloadKind::Config, frame.checksum) {
            return;
        }
        let config = match decode::decode_config(frame.destination, frame.payload) {
            Some(config) => config,
            None => {
                debug!("Configuration payload too short");
                return;
            }
        };
        debug!("Got config {:?}", config);
        if self.scales.native.is_none() {
            info!("Spa temperature scale is {}", config.temp_scale);
            self.change_scales(Scales {
                native: Some(config.temp_scale),
                ..self.scales
            });
        }
        self.config = Some(config);
        self.progress.config = RequestStatus::Received;
        self.last_checksums.record(PayloadKind::Config, frame.checksum);
    }

    fn decode_fault_log(&mut self, frame: &Frame<'_>) {
        if !self.last_checksums.is_new(PayloadKind::FaultLog, frame.checksum) {
            return;
        }
        let entry = match decode::decode_fault_log(frame.payload) {
            Some(entry) => entry,
            None => {
                debug!("Fault log payload too short");
                return;
            }
        };
        debug!(
            "Got fault log entry {:?}: {}",
            entry,
            entry.description().unwrap_or("Unknown error")
        );
        self.fault_log = Some(entry);
        self.progress.fault_log = RequestStatus::Received;
        self.last_checksums.record(PayloadKind::FaultLog, frame.checksum);
    }

    fn decode_filter_settings(&mut self, frame: &Frame<'_>) {
        if !self.last_checksums.is_new(PayloadKind::FilterSettings, frame.checksum) {
            return;
        }
        let settings = match decode::decode_filter_settings(frame.payload) {
            Some(settings) => settings,
            None => {
                debug!("Filter settings payload too short");
                return;
            }
        };
        debug!("Got filter settings {:?}", settings);
        self.filter_settings = Some(settings);
        self.progress.filter_settings = RequestStatus::Received;
        self.last_checksums
            .record(PayloadKind::FilterSettings, frame.checksum);
    }

    fn queue(&mut self, command: Command) {
        if let Some(previous) = self.pending.replace(command) {
            debug!("{:?} replaces unsent {:?}", command, previous);
        }
    }

    /// Request a new set-point, given in the display scale.
    ///
    /// # Errors
    /// Rejects temperatures outside the valid range for the display scale,
    /// and requests made before both scales are known.
    pub fn set_temperature(&mut self, temperature: f32) -> Result<(), CommandError> {
        let result = self.temperature_command(temperature);
        match result {
            Ok(command) => {
                self.queue(command);
                Ok(())
            }
            Err(err) => {
                warn!("set_temperature({}): {}", temperature, err);
                Err(err)
            }
        }
    }

    fn temperature_command(&self, temperature: f32) -> Result<Command, CommandError> {
        let display = self.scales.display.context(DisplayScaleUnknownSnafu)?;
        ensure!(
            temperature::in_range(temperature, display),
            TemperatureOutOfRangeSnafu {
                temperature,
                scale: display
            }
        );
        let native = self.scales.native.context(NativeScaleUnknownSnafu)?;
        let celsius = temperature::from_display(temperature, display);
        Ok(Command::SetTemperature(temperature::to_native(celsius, native)))
    }

    /// Select high or low temperature range. Nothing is sent if the spa is
    /// already in the requested range.
    pub fn set_high_range(&mut self, high: bool) {
        debug!("High range {} requested, currently {}", high, self.state.high_range);
        if high != self.state.high_range {
            self.queue(Command::Toggle(Toggle::HighRange));
        }
    }

    /// Switch between ready and rest heating mode.
    pub fn toggle_heat_mode(&mut self) {
        self.queue(Command::Toggle(Toggle::HeatMode));
    }

    pub fn toggle(&mut self, item: Toggle) {
        self.queue(Command::Toggle(item));
    }

    /// Set the spa clock.
    ///
    /// # Errors
    /// Rejects invalid hours or minutes.
    pub fn set_time(&mut self, hour: u8, minute: u8) -> Result<(), CommandError> {
        let command = Self::clock_command(hour, minute).map_err(|err| {
            warn!("set_time({}, {}): {}", hour, minute, err);
            err
        })?;
        self.queue(command);
        Ok(())
    }

    /// Set the clock hour, keeping the minute.
    ///
    /// # Errors
    /// Rejects invalid hours.
    pub fn set_hour(&mut self, hour: u8) -> Result<(), CommandError> {
        let (_, minute) = self.clock_target();
        self.set_time(hour, minute)
    }

    /// Set the clock minute, keeping the hour.
    ///
    /// # Errors
    /// Rejects invalid minutes.
    pub fn set_minute(&mut self, minute: u8) -> Result<(), CommandError> {
        let (hour, _) = self.clock_target();
        self.set_time(hour, minute)
    }

    fn clock_command(hour: u8, minute: u8) -> Result<Command, CommandError> {
        Ok(Command::SetClock {
            hour: Hour::new(hour).context(ClockSnafu)?,
            minute: Minute::new(minute).context(ClockSnafu)?,
        })
    }

    // A clock change that hasn't been sent yet takes precedence over the
    // spa's clock.
    fn clock_target(&self) -> (u8, u8) {
        match self.pending {
            Some(Command::SetClock { hour, minute }) => (*hour, *minute),
            _ => (self.state.hour, self.state.minute),
        }
    }

    /// Set the clock display format.
    pub fn set_clock_format(&mut self, format: ClockFormat) {
        self.queue(Command::clock_format(format));
    }

    /// Change the scale temperatures are presented in.
    pub fn set_display_scale(&mut self, scale: TempScale) {
        self.change_scales(Scales {
            display: Some(scale),
            ..self.scales
        });
    }

    /// Override the spa's scale instead of learning it.
    pub fn set_native_scale(&mut self, scale: TempScale) {
        self.change_scales(Scales {
            native: Some(scale),
            ..self.scales
        });
    }

    // Temperatures decoded with the old scales are dropped, and the next
    // status broadcast is decoded even if it repeats the last one.
    fn change_scales(&mut self, scales: Scales) {
        if scales == self.scales {
            return;
        }
        debug!("Temperature scales changed to {:?}", scales);
        self.scales = scales;
        self.state.target_temp = None;
        self.state.current_temp = None;
        self.last_checksums.forget(PayloadKind::Status);
    }

    pub fn scales(&self) -> Scales {
        self.scales
    }

    /// The latest decoded status.
    pub fn state(&self) -> &SpaState {
        &self.state
    }

    pub fn config(&self) -> Option<&SpaConfig> {
        self.config.as_ref()
    }

    pub fn fault_log(&self) -> Option<&FaultLogEntry> {
        self.fault_log.as_ref()
    }

    pub fn filter_settings(&self) -> Option<&FilterSettings> {
        self.filter_settings.as_ref()
    }

    pub fn registration(&self) -> Registration {
        self.registration
    }

    pub fn client_id(&self) -> Option<ClientId> {
        match self.registration {
            Registration::Registered(id) => Some(id),
            Registration::Unregistered => None,
        }
    }

    pub fn progress(&self) -> AcquisitionProgress {
        self.progress
    }

    /// The command waiting for the next clear to send.
    pub fn pending_command(&self) -> Option<Command> {
        self.pending
    }

    /// True when the bus has been silent for longer than the liveness timeout.
    pub fn communication_lost(&self) -> bool {
        self.liveness.is_lost()
    }

    /// Registered and hearing from the spa.
    pub fn is_communicating(&self) -> bool {
        self.client_id().is_some() && !self.communication_lost()
    }
}
