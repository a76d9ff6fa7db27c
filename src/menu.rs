/// Interactive console menus for inspecting stored readings
use log::{error, info};
use std::fmt::Write as _;
use std::str::FromStr;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::watch;

use crate::config::SensorConfig;
use crate::database::{check_table, fetch_range};
use crate::models::{HourStamp, TemperatureUnit, TimeRange};
use crate::plot::{plot_script, spawn_plot, PlotKind};
use crate::series::{statistics, Series};
use crate::utils::{format_datetime, now_local};

const DEFAULT_RANGE_HOURS: u32 = 24;

/// Case-insensitive command match on the full word, or on its first
/// letter alone when `allow_initial` is set.
pub fn matches_command(input: &str, word: &str, allow_initial: bool) -> bool {
    let input = input.trim();
    if allow_initial && input.chars().count() == 1 {
        if let (Some(a), Some(b)) = (input.chars().next(), word.chars().next()) {
            return a.eq_ignore_ascii_case(&b);
        }
    }
    input.eq_ignore_ascii_case(word)
}

fn clear_screen() {
    print!("\x1B[2J\x1B[1;1H");
}

/// Line-oriented console input
pub struct Prompt<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> Prompt<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    /// Print `text` and read one trimmed line. None at end of input.
    pub async fn ask(&mut self, text: &str) -> Option<String> {
        print!("{}", text);
        // Flush so the prompt shows before blocking on input
        let _ = std::io::Write::flush(&mut std::io::stdout());
        match self.lines.next_line().await {
            Ok(Some(line)) => Some(line.trim().to_string()),
            Ok(None) => None,
            Err(e) => {
                error!("Failed to read input: {}", e);
                None
            }
        }
    }

    /// Ask for a number; Some(None) when the answer does not parse.
    async fn ask_number<T: FromStr>(&mut self, text: &str) -> Option<Option<T>> {
        let answer = self.ask(text).await?;
        let parsed = answer.parse().ok();
        if parsed.is_none() {
            println!("Invalid number.");
        }
        Some(parsed)
    }

    async fn pause(&mut self) -> Option<()> {
        println!("Enter to continue.");
        self.ask("").await.map(|_| ())
    }
}

/// Console listing of readings followed by summary statistics
pub fn render_listing(series: &Series, unit: TemperatureUnit) -> String {
    let symbol = unit.symbol();
    let mut out = String::new();

    for reading in series {
        let _ = writeln!(
            out,
            "Temperature: {:.3}{} | Humidity: {:.3} | Time: {}",
            reading.temperature(unit),
            symbol,
            reading.humidity(),
            format_datetime(&reading.timestamp())
        );
    }

    match statistics(series, unit) {
        Some(stats) => {
            let _ = writeln!(
                out,
                "\nAverage temperature: {:.3}{} | Average humidity: {:.3}",
                stats.temperature.mean, symbol, stats.humidity.mean
            );
            let _ = writeln!(
                out,
                "Max temperature: {:.3}{} | Max humidity: {:.3}",
                stats.temperature.max, symbol, stats.humidity.max
            );
            let _ = writeln!(
                out,
                "Min temperature: {:.3}{} | Min humidity: {:.3}",
                stats.temperature.min, symbol, stats.humidity.min
            );
        }
        None => out.push_str("No data in the selected range.\n"),
    }
    let _ = writeln!(out, "Total values in set: {}", series.len());
    out
}

/// Settings for the data evaluation menu
#[derive(Debug, Clone, Copy)]
pub struct Evaluation {
    pub range: TimeRange,
    pub kind: PlotKind,
    pub unit: TemperatureUnit,
}

impl Evaluation {
    pub fn last_day() -> Self {
        let now = now_local();
        let current = HourStamp::from_datetime(&now);
        Self {
            range: TimeRange::last_hours(&now, DEFAULT_RANGE_HOURS)
                .unwrap_or(TimeRange::new(current, current)),
            kind: PlotKind::default(),
            unit: TemperatureUnit::default(),
        }
    }
}

fn print_main_commands() {
    println!("{:<12}{:>40}", "Help / H", "Show all commands.");
    println!("{:<12}{:>40}", "Quit / Q", "Quit the program.");
    println!("{:<12}{:>40}", "Test / T", "Test the database connection.");
    println!("{:<12}{:>40}", "Data / D", "Open the tool to check the database.");
    println!("{:<12}{:>40}", "Show / S", "Show the current settings.");
}

fn print_evaluation_commands() {
    println!("{:<18}{:>40}", "Help  / H", "Show all commands.");
    println!("{:<18}{:>40}", "List  / L", "List data in time range.");
    println!("{:<18}{:>40}", "Graph / G", "Graph the data in the time range.");
    println!("{:<18}{:>40}", "Type  / T", "Change graphing type.");
    println!("{:<18}{:>40}", "Range / R", "Set the time range for data retrieval.");
    println!("{:<18}{:>40}", "Fahrenheit / F", "Show temperatures in Fahrenheit.");
    println!("{:<18}{:>40}", "Celsius / C", "Show temperatures in Celsius.");
    println!("{:<18}{:>40}", "Back  / B", "Back to main control.");
}

fn print_range_commands() {
    println!("{:<12}{:>40}", "Help  / H", "Show all commands.");
    println!("{:<12}{:>40}", "Start / S", "Edit the start time.");
    println!("{:<12}{:>40}", "End   / E", "Edit the end time.");
    println!("{:<12}{:>40}", "Back  / B", "Back to data evaluation.");
}

fn print_stamp_commands() {
    println!("{:<14}{:>45}", "Help", "Show all commands.");
    println!("{:<14}{:>45}", "Year     / Y", "Set the year.");
    println!("{:<14}{:>45}", "Month    / M", "Set the month (1 - 12).");
    println!("{:<14}{:>45}", "Day      / D", "Set the day (1 - 31).");
    println!("{:<14}{:>45}", "Hour     / H", "Set the hour (0 [12am] - 23 [11pm]).");
    println!("{:<14}{:>45}", "Current  / C", "Set the time to the current hour.");
    println!("{:<14}{:>45}", "Subtract / S", "Set the time to current - hours input.");
    println!("{:<14}{:>45}", "Back     / B", "Back to range settings (keeps changes).");
}

/// Edit one end of a range in place. Returns None at end of input.
pub async fn edit_stamp<R>(prompt: &mut Prompt<R>, stamp: &mut HourStamp) -> Option<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        println!("CURRENT TIME");
        println!("{}", stamp);
        let input = prompt.ask("> ").await?;

        if matches_command(&input, "help", false) {
            print_stamp_commands();
            prompt.pause().await?;
        } else if matches_command(&input, "year", true) {
            if let Some(year) = prompt.ask_number::<i32>("Enter new year: ").await? {
                stamp.year = year;
            }
        } else if matches_command(&input, "month", true) {
            match prompt.ask_number::<u8>("Enter new month (1 - 12): ").await? {
                Some(month @ 1..=12) => stamp.month = month,
                _ => println!("Invalid month."),
            }
        } else if matches_command(&input, "day", true) {
            match prompt.ask_number::<u8>("Enter new day (1 - 31): ").await? {
                Some(day @ 1..=31) => stamp.day = day,
                _ => println!("Invalid day."),
            }
        } else if matches_command(&input, "hour", true) {
            match prompt.ask_number::<u8>("Enter new hour (0 - 23): ").await? {
                Some(hour @ 0..=23) => stamp.hour = hour,
                _ => println!("Invalid hour."),
            }
        } else if matches_command(&input, "current", true) {
            *stamp = HourStamp::from_datetime(&now_local());
        } else if matches_command(&input, "subtract", true) {
            if let Some(hours) = prompt
                .ask_number::<u32>("Enter hours back from the current time: ")
                .await?
            {
                match HourStamp::hours_before(&now_local(), hours) {
                    Some(then) => *stamp = then,
                    None => println!("Invalid hours."),
                }
            }
        } else if matches_command(&input, "back", true) {
            return Some(());
        }
    }
}

/// Edit the start or end of `range`, reverting any edit that would put
/// the start after the end.
pub async fn edit_range<R>(prompt: &mut Prompt<R>, range: &mut TimeRange) -> Option<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        println!("CHANGE TIME RANGE");
        println!("{}", range);
        let input = prompt.ask("> ").await?;

        if matches_command(&input, "help", true) {
            print_range_commands();
            prompt.pause().await?;
        } else if matches_command(&input, "start", true) {
            let mut edited = *range;
            edit_stamp(prompt, &mut edited.start).await?;
            if edited.is_ordered() {
                *range = edited;
            } else {
                println!("Start time exceeds end time. Reverting.");
            }
        } else if matches_command(&input, "end", true) {
            let mut edited = *range;
            edit_stamp(prompt, &mut edited.end).await?;
            if edited.is_ordered() {
                *range = edited;
            } else {
                println!("End time is less than the start time. Reverting.");
            }
        } else if matches_command(&input, "back", true) {
            return Some(());
        }
    }
}

async fn list_data(config: &SensorConfig, evaluation: &Evaluation) {
    match fetch_range(&evaluation.range, &config.database).await {
        Ok(series) => print!("{}", render_listing(&series.sorted(), evaluation.unit)),
        Err(e) => println!("Failed to fetch data: {}", e),
    }
}

async fn graph_data(config: &SensorConfig, evaluation: &Evaluation) {
    let series = match fetch_range(&evaluation.range, &config.database).await {
        Ok(series) => series,
        Err(e) => {
            println!("Failed to fetch data: {}", e);
            return;
        }
    };

    match plot_script(series, &evaluation.range, evaluation.kind, evaluation.unit) {
        Some(script) => {
            if let Err(e) = spawn_plot(&script).await {
                println!("{}", e);
            }
        }
        None => println!("No data in the selected range."),
    }
}

async fn evaluation_menu<R>(prompt: &mut Prompt<R>, config: &SensorConfig) -> Option<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut evaluation = Evaluation::last_day();
    clear_screen();

    loop {
        println!("DATA EVALUATION");
        println!("{}", evaluation.range);
        println!("Graph {}", evaluation.kind.name());
        println!("Temperature type: {}", evaluation.unit.name());
        let input = prompt.ask("> ").await?;

        if matches_command(&input, "help", true) {
            print_evaluation_commands();
            prompt.pause().await?;
        } else if matches_command(&input, "list", true) {
            list_data(config, &evaluation).await;
            prompt.pause().await?;
        } else if matches_command(&input, "graph", true) {
            graph_data(config, &evaluation).await;
            prompt.pause().await?;
        } else if matches_command(&input, "fahrenheit", true) {
            evaluation.unit = TemperatureUnit::Fahrenheit;
        } else if matches_command(&input, "celsius", true) {
            evaluation.unit = TemperatureUnit::Celsius;
        } else if matches_command(&input, "type", true) {
            let answer = prompt
                .ask("Enter a graphing type (BOTH / B, TEMPERATURE / T, HUMIDITY / H)\n> ")
                .await?;
            if matches_command(&answer, "both", true) {
                evaluation.kind = PlotKind::Both;
            } else if matches_command(&answer, "temperature", true) {
                evaluation.kind = PlotKind::Temperature;
            } else if matches_command(&answer, "humidity", true) {
                evaluation.kind = PlotKind::Humidity;
            }
        } else if matches_command(&input, "range", true) {
            edit_range(prompt, &mut evaluation.range).await?;
        } else if matches_command(&input, "back", true) {
            return Some(());
        }
        clear_screen();
    }
}

fn print_settings(config: &SensorConfig) {
    println!("Current settings");
    println!("\tSENSOR_TABLE = {}", config.database.table);
    println!("\tLCD_ADDRESS = 0x{:X}", config.lcd_address);
    println!("\tDHT11_PIN = {}", config.dht11_pin);
    println!("\tRATE_SECONDS = {}", config.rate_seconds);
    println!("\tMAX_READ_TRIES = {}", config.max_read_tries);
    println!("\tMAX_STORE_TRIES = {}", config.max_store_tries);
}

/// Run the main menu until the user quits or input ends, then raise
/// the stop flag for the collector.
pub async fn run_menu<R>(mut prompt: Prompt<R>, config: &SensorConfig, stop: watch::Sender<bool>)
where
    R: AsyncBufRead + Unpin,
{
    println!("{:<12}{:>40}", "Help / H", "Show all commands.");

    loop {
        let Some(input) = prompt.ask("> ").await else {
            break;
        };

        let finished = if matches_command(&input, "help", true) {
            print_main_commands();
            prompt.pause().await.is_none()
        } else if matches_command(&input, "quit", true) {
            println!("Quitting application...");
            break;
        } else if matches_command(&input, "test", true) {
            match check_table(&config.database).await {
                Ok(true) => println!("Connection is valid."),
                Ok(false) => println!(
                    "Connection is NOT valid: table '{}' not found.",
                    config.database.table
                ),
                Err(e) => println!("Connection is NOT valid: {}", e),
            }
            prompt.pause().await.is_none()
        } else if matches_command(&input, "data", true) {
            evaluation_menu(&mut prompt, config).await.is_none()
        } else if matches_command(&input, "show", true) {
            print_settings(config);
            prompt.pause().await.is_none()
        } else {
            false
        };

        if finished {
            break;
        }
    }

    info!("Stopping collector");
    let _ = stop.send(true);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Reading;
    use time::macros::datetime;

    fn stamp(year: i32, month: u8, day: u8, hour: u8) -> HourStamp {
        HourStamp { year, month, day, hour }
    }

    #[test]
    fn commands_match_word_or_initial() {
        assert!(matches_command("Help", "help", true));
        assert!(matches_command(" h ", "help", true));
        assert!(!matches_command("h", "help", false));
        assert!(matches_command("QUIT", "quit", false));
        assert!(!matches_command("qu", "quit", true));
        assert!(!matches_command("", "quit", true));
    }

    #[test]
    fn listing_includes_summary() {
        let series: Series = [
            Reading::new(20.0, 50.0, datetime!(2024-05-01 10:00:00)),
            Reading::new(22.0, 60.0, datetime!(2024-05-01 10:10:00)),
        ]
        .into_iter()
        .collect();
        let listing = render_listing(&series, TemperatureUnit::Celsius);
        assert!(listing.starts_with(
            "Temperature: 20.000C | Humidity: 50.000 | Time: 2024-05-01 10:00:00\n"
        ));
        assert!(listing.contains("Average temperature: 21.000C | Average humidity: 55.000\n"));
        assert!(listing.contains("Max temperature: 22.000C | Max humidity: 60.000\n"));
        assert!(listing.contains("Min temperature: 20.000C | Min humidity: 50.000\n"));
        assert!(listing.ends_with("Total values in set: 2\n"));
    }

    #[test]
    fn empty_listing_reports_no_data() {
        let listing = render_listing(&Series::new(), TemperatureUnit::Fahrenheit);
        assert_eq!(
            listing,
            "No data in the selected range.\nTotal values in set: 0\n"
        );
    }

    #[tokio::test]
    async fn stamp_fields_are_edited_and_validated() {
        let input: &[u8] = b"y\n2023\nm\n13\nm\n2\nd\n28\nh\n24\nh\n7\nb\n";
        let mut prompt = Prompt::new(input);
        let mut edited = stamp(2024, 5, 1, 10);
        edit_stamp(&mut prompt, &mut edited).await.unwrap();
        assert_eq!(edited, stamp(2023, 2, 28, 7));
    }

    #[tokio::test]
    async fn range_edit_reverts_when_start_passes_end() {
        let input: &[u8] = b"s\ny\n2030\nb\ne\nd\n2\nb\nb\n";
        let mut prompt = Prompt::new(input);
        let mut range = TimeRange::new(stamp(2024, 5, 1, 0), stamp(2024, 5, 1, 23));
        edit_range(&mut prompt, &mut range).await.unwrap();
        assert_eq!(range.start, stamp(2024, 5, 1, 0));
        assert_eq!(range.end, stamp(2024, 5, 2, 23));
    }

    #[tokio::test]
    async fn subtracting_too_many_hours_keeps_the_stamp() {
        let input: &[u8] = b"s\n200000000\nb\n";
        let mut prompt = Prompt::new(input);
        let mut edited = stamp(2024, 5, 1, 10);
        edit_stamp(&mut prompt, &mut edited).await.unwrap();
        assert_eq!(edited, stamp(2024, 5, 1, 10));
    }

    #[tokio::test]
    async fn end_of_input_leaves_the_editor() {
        let input: &[u8] = b"y\n";
        let mut prompt = Prompt::new(input);
        let mut edited = stamp(2024, 5, 1, 10);
        assert_eq!(edit_stamp(&mut prompt, &mut edited).await, None);
        assert_eq!(edited, stamp(2024, 5, 1, 10));
    }

    #[tokio::test]
    async fn quitting_raises_the_stop_flag() {
        let config = SensorConfig::from_lookup(|key| {
            (key == "DATABASE_URL").then(|| "postgres://localhost/env".to_string())
        })
        .unwrap();
        let (tx, rx) = watch::channel(false);
        let input: &[u8] = b"nonsense\nq\n";
        run_menu(Prompt::new(input), &config, tx).await;
        assert!(*rx.borrow());
    }
}
