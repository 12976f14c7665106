//! namekeeper - Handshake name renewal
//!
//! Single binary with subcommands:
//!   namekeeper               - Renew in a loop (default)
//!   namekeeper run           - One renewal cycle
//!   namekeeper status        - Show wallet status
//!   namekeeper init-config   - Write a default config file

mod keeper;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let rest = args.get(2..).map(<[String]>::to_vec).unwrap_or_default();

    let result = match args.get(1).map(String::as_str) {
        Some("run") => keeper::run(keeper::Mode::Once, rest),
        Some("status") => keeper::run(keeper::Mode::Status, rest),
        Some("init-config") => keeper::init_config(rest.first().map(String::as_str)).map(|()| 0),
        Some("loop") => keeper::run(keeper::Mode::Loop, rest),
        Some("--help" | "-h") => {
            print_help();
            Ok(0)
        }
        Some("--version" | "-V") => {
            println!("namekeeper {}", namekeeper::VERSION);
            Ok(0)
        }
        // Bare flags like `--config` belong to the default loop
        _ => keeper::run(keeper::Mode::Loop, args.get(1..).map(<[String]>::to_vec).unwrap_or_default()),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

fn print_help() {
    println!("namekeeper v{}", namekeeper::VERSION);
    println!("Unattended Handshake name renewal");
    println!();
    println!("USAGE:");
    println!("    namekeeper [COMMAND] [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    (default)        Run a renewal cycle every loop period");
    println!("    loop             Same as the default");
    println!("    run              Run one renewal cycle and exit");
    println!("    status           Print block height, balance and soonest expiry");
    println!("    init-config      Write the default config (to PATH if given)");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <PATH>   Config file (default: ~/.namekeeper/config.toml)");
    println!("    -h, --help            Print help");
    println!("    -V, --version         Print version");
    println!();
    println!("ENVIRONMENT:");
    println!("    RUST_LOG                    Log filter (default: info)");
    println!("    RENEWAL_THRESHOLD_DAYS      Renew names expiring within this many days");
    println!("    LOOP_PERIOD_SECONDS         Seconds between cycles");
    println!("    WALLET_ID, WALLET_PASSPHRASE, WALLET_ACCOUNT");
    println!("    NODE_URL, NODE_API_KEY, WALLET_URL, WALLET_API_KEY");
    println!("    TELEGRAM_BOT_TOKEN, TELEGRAM_CHAT_ID");
    println!();
    println!("EXIT STATUS:");
    println!("    0   Cycle finished (renewal failures are reported, not fatal)");
    println!("    1   Names could not be listed and the report could not be sent");
}
