use crate::Cli;

pub fn run(cli: &Cli) {
    let version = env!("CARGO_PKG_VERSION");
    if cli.output.is_json() {
        let _ = crate::out::write_json(&serde_json::json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": version,
        }));
    } else if !cli.output.is_none() {
        println!("{} {}", env!("CARGO_PKG_NAME"), version);
    }
}
