use anyhow::{Context, Result, bail};
use chrono::{Duration, Local};
use clap::{Parser, Subcommand};
use colored::*;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use shared::{Alert, AlertSeverity, SaveLogEntry, Schedule, Stats, WatchedDevice};

const RULE: &str = "═══════════════════════════════════════════════════════";

#[derive(Parser)]
#[command(name = "sentinel-cli")]
#[command(about = "Kismet Sentinel Command Line Interface", long_about = None)]
struct Cli {
    /// Dashboard base URL
    #[arg(long, default_value = "http://localhost:5000", env = "SENTINEL_URL")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display recent alerts
    Alerts {
        /// Filter by severity (info, warning, critical, error)
        #[arg(short, long)]
        severity: Option<String>,

        /// Filter by type (drone, signal, kismet, save, error)
        #[arg(short = 't', long = "type")]
        category: Option<String>,

        /// Show at most N alerts (newest)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show alerts raised within a time window
    Timeline {
        /// Time window (e.g., "30m", "1h", "7d")
        #[arg(short, long, default_value = "1h")]
        last: String,
    },

    /// Show statistics
    Stats,

    /// Manage the watchlist
    Watch {
        #[command(subcommand)]
        action: WatchAction,
    },

    /// Trigger a batch save
    Save {
        #[arg(short, long, default_value = "manual")]
        label: String,

        /// Also print the recent save log
        #[arg(long)]
        log: bool,
    },

    /// Manage scheduled saves
    Schedules {
        #[command(subcommand)]
        action: ScheduleAction,
    },
}

#[derive(Subcommand)]
enum WatchAction {
    List,
    Add {
        mac: String,
        #[arg(short, long, default_value = "")]
        name: String,
    },
    Remove {
        mac: String,
    },
}

#[derive(Subcommand)]
enum ScheduleAction {
    List,
    Add {
        #[arg(short, long, default_value = "Auto Save")]
        name: String,
        /// Minutes between saves
        #[arg(short, long, default_value_t = 30)]
        interval: u64,
    },
    Remove {
        id: String,
    },
}

struct Api {
    base: String,
    http: Client,
}

impl Api {
    fn new(base: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn get<T: DeserializeOwned>(&self, path: &str, field: &str) -> Result<T> {
        let body: Value = self
            .http
            .get(format!("{}{}", self.base, path))
            .send()
            .with_context(|| format!("GET {} failed; is the dashboard running at {}?", path, self.base))?
            .json()?;
        take_field(body, field)
    }

    fn send(&self, method: reqwest::Method, path: &str, body: Value) -> Result<Value> {
        let response = self
            .http
            .request(method, format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .with_context(|| format!("request to {} failed", path))?;
        let status = response.status();
        let body: Value = response.json()?;
        if !status.is_success() {
            bail!("{}: {}", status, body["error"].as_str().unwrap_or("request failed"));
        }
        Ok(body)
    }
}

fn take_field<T: DeserializeOwned>(mut body: Value, field: &str) -> Result<T> {
    let value = if field.is_empty() {
        body
    } else {
        body.get_mut(field).map(Value::take).unwrap_or(Value::Null)
    };
    serde_json::from_value(value).with_context(|| format!("unexpected response shape for '{}'", field))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let api = Api::new(&cli.server)?;

    match cli.command {
        Commands::Alerts { severity, category, limit } => show_alerts(&api, severity, category, limit)?,
        Commands::Timeline { last } => show_timeline(&api, &last)?,
        Commands::Stats => show_stats(&api)?,
        Commands::Watch { action } => watch(&api, action)?,
        Commands::Save { label, log } => save(&api, &label, log)?,
        Commands::Schedules { action } => schedules(&api, action)?,
    }

    Ok(())
}

fn banner(title: &str, subtitle: &str) {
    println!("\n{}", RULE.cyan());
    println!("{} {}", title.bright_cyan().bold(), subtitle.white());
    println!("{}\n", RULE.cyan());
}

fn show_alerts(
    api: &Api,
    severity: Option<String>,
    category: Option<String>,
    limit: Option<usize>,
) -> Result<()> {
    let mut query = vec![format!("limit={}", limit.unwrap_or(100))];
    if let Some(s) = severity {
        query.push(format!("severity={}", s.to_lowercase()));
    }
    if let Some(t) = category {
        query.push(format!("type={}", t.to_lowercase()));
    }
    let alerts: Vec<Alert> = api.get(&format!("/api/alerts?{}", query.join("&")), "alerts")?;

    banner("Kismet Sentinel", "Alerts");
    if alerts.is_empty() {
        println!("{}", "No alerts matching criteria.".yellow());
        return Ok(());
    }

    // Oldest first so the newest ends up next to the prompt.
    for alert in alerts.iter().rev() {
        print_alert(alert);
    }
    Ok(())
}

fn print_alert(alert: &Alert) {
    let severity = alert.severity.as_str().to_uppercase();
    let severity_colored = match alert.severity {
        AlertSeverity::Critical | AlertSeverity::Error => severity.red().bold(),
        AlertSeverity::Warning => severity.yellow().bold(),
        AlertSeverity::Info => severity.green().bold(),
    };

    println!(
        "[{}] {} {}",
        alert.ts.format("%Y-%m-%d %H:%M:%S").to_string().bright_black(),
        severity_colored,
        alert.title.bright_white().bold()
    );
    println!("  {} {}", "Type:".bright_blue(), alert.category);
    if let Some(ref mac) = alert.mac {
        println!("  {} {}", "MAC:".bright_blue(), mac);
    }
    if !alert.body.is_empty() {
        println!("  {} {}", "Details:".bright_blue(), alert.body.bright_black());
    }
    println!();
}

fn show_timeline(api: &Api, window: &str) -> Result<()> {
    let cutoff = Local::now() - parse_duration(window)?;
    let alerts: Vec<Alert> = api.get("/api/alerts?limit=100000", "alerts")?;

    println!("\n{}", RULE.cyan());
    println!("{} {} {}", "Timeline".bright_cyan().bold(), "- Last".white(), window.bright_white());
    println!("{}\n", RULE.cyan());

    let recent: Vec<&Alert> = alerts.iter().rev().filter(|a| a.ts >= cutoff).collect();
    if recent.is_empty() {
        println!("{}", "No alerts in this time window.".yellow());
    }
    for alert in recent {
        print_alert(alert);
    }
    Ok(())
}

fn show_stats(api: &Api) -> Result<()> {
    let stats: Stats = api.get("/api/stats", "")?;

    banner("Kismet Sentinel", "Statistics");
    println!("{} {}", "Total Alerts:".bright_blue(), stats.total_alerts.to_string().bright_white().bold());
    for (category, count) in &stats.by_category {
        println!("  {:<10} {}", format!("{}:", category), count);
    }
    println!();
    for (severity, count) in &stats.by_severity {
        let label = format!("{}:", severity.to_uppercase());
        let label = match severity.as_str() {
            "critical" | "error" => label.red().bold(),
            "warning" => label.yellow().bold(),
            _ => label.green().bold(),
        };
        println!("{} {}", label, count);
    }
    println!();
    println!("{} {}", "Watched devices:".bright_blue(), stats.watched);
    println!("{} {}", "Schedules:".bright_blue(), stats.schedules);
    println!(
        "{} {}",
        "Last save:".bright_blue(),
        stats.last_save.as_deref().unwrap_or("never")
    );
    if let Some(err) = &stats.last_error {
        println!("{} {}", "Last error:".red().bold(), err);
    }
    println!();
    Ok(())
}

fn watch(api: &Api, action: WatchAction) -> Result<()> {
    match action {
        WatchAction::List => {
            let devices: Vec<WatchedDevice> = api.get("/api/watchlist", "devices")?;
            banner("Watchlist", &format!("({} devices)", devices.len()));
            for d in devices {
                let origin = if d.auto { "auto".magenta() } else { "manual".normal() };
                println!(
                    "{}  {:<24} {:<12} {} [{}]",
                    d.mac.bright_white().bold(),
                    d.name,
                    d.phyname,
                    d.reason.bright_black(),
                    origin
                );
            }
        }
        WatchAction::Add { mac, name } => {
            let body = api.send(reqwest::Method::POST, "/api/watchlist", json!({ "mac": mac, "name": name }))?;
            println!("{} {} ({} watched)", "Watching".green().bold(), mac.to_uppercase(), body["watched"]);
        }
        WatchAction::Remove { mac } => {
            let body = api.send(reqwest::Method::DELETE, &format!("/api/watchlist/{}", mac), Value::Null)?;
            println!("{} {} ({} watched)", "Removed".yellow().bold(), mac.to_uppercase(), body["watched"]);
        }
    }
    Ok(())
}

fn save(api: &Api, label: &str, show_log: bool) -> Result<()> {
    api.send(reqwest::Method::POST, "/api/save", json!({ "label": label }))?;
    println!("{} '{}'", "Save started".green().bold(), label);

    if show_log {
        let log: Vec<SaveLogEntry> = api.get("/api/save/log", "log")?;
        banner("Save Log", "");
        for entry in log {
            if entry.ok {
                println!("{} {} {} devices -> {}", "✓".green(), entry.ts, entry.count, entry.file.bright_black());
            } else {
                println!("{} {} {}", "✗".red(), entry.ts, entry.error.unwrap_or_default().red());
            }
        }
    }
    Ok(())
}

fn schedules(api: &Api, action: ScheduleAction) -> Result<()> {
    match action {
        ScheduleAction::List => {
            let schedules: Vec<Schedule> = api.get("/api/schedules", "schedules")?;
            banner("Schedules", "");
            if schedules.is_empty() {
                println!("{}", "No schedules.".yellow());
            }
            for s in schedules {
                let next = match (s.enabled, s.next_run) {
                    (true, Some(next)) => format!("next {}", next.format("%H:%M:%S")),
                    (true, None) => "pending".to_string(),
                    (false, _) => "disabled".to_string(),
                };
                println!("{}  {:<20} every {:>4} min  {}", s.id.bright_black(), s.name.bright_white(), s.interval_min, next);
            }
        }
        ScheduleAction::Add { name, interval } => {
            let body = api.send(
                reqwest::Method::POST,
                "/api/schedules",
                json!({ "name": name, "interval_min": interval }),
            )?;
            let schedule: Schedule = take_field(body, "schedule")?;
            println!("{} {} ({})", "Added".green().bold(), schedule.name, schedule.id);
        }
        ScheduleAction::Remove { id } => {
            api.send(reqwest::Method::DELETE, &format!("/api/schedules/{}", id), Value::Null)?;
            println!("{} {}", "Removed".yellow().bold(), id);
        }
    }
    Ok(())
}

fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let Some(unit) = s.chars().last() else {
        bail!("Invalid duration format");
    };
    let num: i64 = s[..s.len() - unit.len_utf8()].parse().context("Invalid duration format")?;

    match unit {
        'h' => Ok(Duration::hours(num)),
        'd' => Ok(Duration::days(num)),
        'm' => Ok(Duration::minutes(num)),
        _ => bail!("Invalid duration format"),
    }
}
