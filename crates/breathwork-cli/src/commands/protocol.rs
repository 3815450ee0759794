use clap::Subcommand;
use breathwork_core::Config;

#[derive(Subcommand)]
pub enum ProtocolAction {
    /// List available protocols
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a protocol's full definition as JSON
    Show {
        /// Protocol id (e.g. "box-breathing")
        id: String,
    },
}

pub fn run(action: ProtocolAction) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Config::load()?.catalog();

    match action {
        ProtocolAction::List { json } => {
            if json {
                let protocols: Vec<_> = catalog.iter().collect();
                println!("{}", serde_json::to_string_pretty(&protocols)?);
            } else {
                for protocol in catalog.iter() {
                    let pattern: Vec<String> =
                        protocol.pattern.iter().map(|secs| secs.to_string()).collect();
                    println!(
                        "{:<16} {:<22} {:<10} {:>3}s/cycle  {}s",
                        protocol.id,
                        protocol.name,
                        pattern.join("-"),
                        protocol.cycle_secs(),
                        protocol.session_duration
                    );
                }
            }
        }
        ProtocolAction::Show { id } => {
            let protocol = catalog.require(&id)?;
            println!("{}", serde_json::to_string_pretty(protocol)?);
        }
    }
    Ok(())
}
