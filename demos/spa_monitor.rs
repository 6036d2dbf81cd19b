use anyhow::{bail, Context, Result};
use std::io::{Read as _, Write as _};
use std::str::{FromStr, SplitWhitespace};
use std::sync::mpsc;
use std::time::Duration;

use balboa_proto::spa::{NoDirectionPin, StdDelay};
use balboa_proto::{Client, ClockFormat, Settings, Spa, SpaState, Toggle};
use embedded_io::ErrorKind;

const BAUD_RATE: u32 = 115_200;

/// `embedded-io` view of a serial port. USB RS-485 adapters switch the
/// transceiver direction themselves.
struct Port(Box<dyn serialport::SerialPort>);

fn io_kind(err: std::io::Error) -> ErrorKind {
    match err.kind() {
        std::io::ErrorKind::TimedOut => ErrorKind::TimedOut,
        std::io::ErrorKind::Interrupted => ErrorKind::Interrupted,
        _ => ErrorKind::Other,
    }
}

impl embedded_io::ErrorType for Port {
    type Error = ErrorKind;
}

impl embedded_io::Read for Port {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
        self.0.read(buf).map_err(io_kind)
    }
}

impl embedded_io::ReadReady for Port {
    fn read_ready(&mut self) -> Result<bool, ErrorKind> {
        self.0
            .bytes_to_read()
            .map(|n| n > 0)
            .map_err(|_| ErrorKind::Other)
    }
}

impl embedded_io::Write for Port {
    fn write(&mut self, buf: &[u8]) -> Result<usize, ErrorKind> {
        self.0.write(buf).map_err(io_kind)
    }

    fn flush(&mut self) -> Result<(), ErrorKind> {
        self.0.flush().map_err(io_kind)
    }
}

fn print_state(state: &SpaState) {
    let temp = |t: Option<f32>| t.map_or("--".to_string(), |t| format!("{:.1}", t));
    println!(
        "{:02}:{:02} water {} target {} heating {} rest {} jets {:?} light {} blower {}",
        state.hour,
        state.minute,
        temp(state.current_temp),
        temp(state.target_temp),
        state.heating,
        state.rest_mode,
        state.jets,
        state.light1,
        state.blower,
    );
}

fn print_info(client: &Client) {
    println!("{:?}, {:?}", client.registration(), client.progress());
    if let Some(config) = client.config() {
        println!("{:?}", config);
    }
    if let Some(fault) = client.fault_log() {
        println!(
            "Last fault: {} ({}), {} days ago at {:02}:{:02}",
            fault.code,
            fault.description().unwrap_or("Unknown error"),
            fault.days_ago,
            fault.hour,
            fault.minute
        );
    }
    if let Some(filters) = client.filter_settings() {
        println!("{:?}", filters);
    }
}

fn run_command(line: &str, client: &mut Client) -> Result<()> {
    let mut args = CmdScanner::new(line);
    match args.next()? {
        "temp" => client.set_temperature(args.parse_next()?)?,
        "time" => client.set_time(args.parse_next()?, args.parse_next()?)?,
        "hour" => client.set_hour(args.parse_next()?)?,
        "minute" => client.set_minute(args.parse_next()?)?,
        "12h" => client.set_clock_format(ClockFormat::TwelveHour),
        "24h" => client.set_clock_format(ClockFormat::TwentyFourHour),
        "range" => client.set_high_range(args.next()? == "high"),
        "mode" => client.toggle_heat_mode(),
        "light" => client.toggle(Toggle::Light1),
        "light2" => client.toggle(Toggle::Light2),
        "blower" => client.toggle(Toggle::Blower),
        "jet" => client.toggle(match args.parse_next::<u8>()? {
            1 => Toggle::Jet1,
            2 => Toggle::Jet2,
            3 => Toggle::Jet3,
            4 => Toggle::Jet4,
            n => bail!("No jet {}", n),
        }),
        "info" => print_info(client),
        cmd => bail!("Unknown command {}", cmd),
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args();
    args.next(); // Skip program name
    let port = args.next().unwrap_or_else(|| "/dev/ttyUSB0".to_string());

    let serial = serialport::new(&port, BAUD_RATE)
        .timeout(Duration::from_millis(10))
        .open()
        .with_context(|| format!("Failed to open serial port {}", port))?;

    let settings = Settings::default().with_baud_rate(BAUD_RATE);
    let mut spa = Spa::new(Port(serial), NoDirectionPin, StdDelay, settings)?;

    let mut last_state: Option<SpaState> = None;
    spa.add_listener(move |state| {
        if last_state.as_ref() != Some(state) {
            print_state(state);
            last_state = Some(state.clone());
        }
    });

    let (line_tx, line_rx) = mpsc::channel::<String>();
    std::thread::spawn(move || {
        let mut buf = String::new();
        while std::io::stdin().read_line(&mut buf).map_or(false, |n| n > 0) {
            if line_tx.send(buf.trim().to_string()).is_err() {
                break;
            }
            buf.clear();
        }
    });

    let mut was_communicating = false;
    loop {
        spa.update()?;

        let communicating = spa.client().is_communicating();
        if communicating != was_communicating {
            println!(
                "{}",
                if communicating {
                    "Connected to spa"
                } else {
                    "Waiting for spa"
                }
            );
            was_communicating = communicating;
        }

        match line_rx.try_recv() {
            Ok(line) if !line.is_empty() => {
                if let Err(err) = run_command(&line, spa.client_mut()) {
                    println!("{}", err);
                }
            }
            Err(mpsc::TryRecvError::Disconnected) => break,
            _ => {}
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    Ok(())
}

struct CmdScanner<'a> {
    splt: SplitWhitespace<'a>,
}

impl<'a> CmdScanner<'a> {
    fn new(line: &'a str) -> Self {
        Self {
            splt: line.split_whitespace(),
        }
    }

    fn next(&mut self) -> Result<&'a str> {
        self.splt.next().context("Missing argument")
    }

    fn parse_next<T: FromStr>(&mut self) -> Result<T> {
        self.next()?.parse::<T>().ok().context("Parse error")
    }
}
