use chrono::Datelike;

use deskbook::config::ClientConfig;
use deskbook::attendance::format_duration;
use deskbook::utils::{print_attendance, print_cache, print_task};
use deskbook::{AttendanceTracker, Client, Scheduler, TaskList};

/// Prints what the configured API currently holds
#[tokio::main]
async fn main() {
    env_logger::init();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {}", err);
            std::process::exit(1);
        },
    };
    println!("Using {}", config.api_url);

    let client = |config: &ClientConfig| match Client::new(config) {
        Ok(client) => client,
        Err(err) => {
            eprintln!("Unable to build a client: {}", err);
            std::process::exit(1);
        },
    };

    let mut scheduler = Scheduler::new(client(&config)).with_timeout(config.timeout);
    println!("Reservations:");
    match scheduler.load().await {
        Ok(_) => print_cache(scheduler.cache()),
        Err(err) => println!("    unable to load reservations: {}", err),
    }

    let mut tasks = TaskList::new(client(&config));
    println!("Tasks:");
    match tasks.load().await {
        Ok(()) => tasks.tasks().iter().for_each(print_task),
        Err(err) => println!("    unable to load tasks: {}", err),
    }

    let mut attendance = AttendanceTracker::new(client(&config), config.standard_workday);
    println!("Attendance:");
    match attendance.refresh_today().await {
        Ok(()) => match attendance.today() {
            Some(record) => print_attendance(record),
            None => println!("    not clocked in today"),
        },
        Err(err) => println!("    unable to load today's record: {}", err),
    }

    let now = chrono::Utc::now();
    match attendance.load_month(now.year(), now.month()).await {
        Ok(()) => {
            attendance.month().iter().for_each(print_attendance);
            println!("This month: {} worked, {} overtime",
                format_duration(attendance.month_total()),
                format_duration(attendance.month_overtime()));
        },
        Err(err) => println!("    unable to load this month: {}", err),
    }
}
