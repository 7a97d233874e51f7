/// CLI tool for checking a dropdown configuration against a field's allowed values
use ordered_dropdown::config::parse_configured_values;
use ordered_dropdown::diagnostic::report_configuration;
use ordered_dropdown::host::{HostServices, InMemoryFieldStore, RecordingLayout};
use ordered_dropdown::{ControlConfig, Controller, ControllerOptions};
use std::env;
use std::process;
use tracing_subscriber::EnvFilter;

const FIELD: &str = "Cli.Field";

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  ordered-dropdown <values> <allowed> [current]   Show the list the control would render");
    eprintln!("  ordered-dropdown --help                         Show this help message");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  <values>    Configured order, semicolon-delimited (the control's Values input)");
    eprintln!("  <allowed>   Allowed values of the field, semicolon-delimited");
    eprintln!("  [current]   Current value of the field");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  ordered-dropdown \"Medium;Low\" \"Low;Medium;High\"");
    eprintln!("  ordered-dropdown \"2;1\" \"1;2;3;4\" 3");
    eprintln!();
    eprintln!("Set RUST_LOG=debug to follow the load cycle.");
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    if args[1] == "--help" || args[1] == "-h" {
        print_usage();
        process::exit(0);
    }

    if args.len() < 3 {
        eprintln!("Missing allowed values");
        print_usage();
        process::exit(1);
    }

    let values = &args[1];
    let allowed = parse_configured_values(&args[2]);

    // Warnings go to stderr so stdout stays machine-readable
    eprint!("{}", report_configuration("<values>", values, &allowed));

    let store = InMemoryFieldStore::new();
    store.set_allowed_values(FIELD, allowed);
    if let Some(current) = args.get(3) {
        store.insert_value(FIELD, current.as_str());
    }

    let services = HostServices::in_memory(
        ControlConfig::new(FIELD, values.as_str()),
        store,
        RecordingLayout::new(),
    );
    let controller = Controller::new(services, ControllerOptions::new());

    if let Err(e) = controller.initialize().await {
        eprintln!("Error loading control: {}", e);
        process::exit(1);
    }

    match serde_json::to_string_pretty(&controller.view()) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error rendering view: {}", e);
            process::exit(1);
        }
    }
}
