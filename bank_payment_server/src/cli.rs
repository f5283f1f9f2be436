use std::{env, env::VarError};

/// The server takes no arguments. Anything on the command line prints the help text and the current configuration.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Secrets (BPG_JWT_SECRET, BPG_WEBHOOK_API_KEY, BPG_SEPAY_API_TOKEN) are deliberately left out
    const DISPLAY_ENVS: [&str; 21] = [
        "RUST_LOG",
        "BPG_HOST",
        "BPG_PORT",
        "BPG_DATABASE_URL",
        "BPG_SEPAY_API_URL",
        "BPG_SEPAY_ACCOUNT_NUMBER",
        "BPG_SEPAY_TIMEOUT_SECS",
        "BPG_BANK_ID",
        "BPG_BANK_ACCOUNT_NUMBER",
        "BPG_BANK_ACCOUNT_NAME",
        "BPG_QR_TEMPLATE",
        "BPG_QR_IMAGE_BASE_URL",
        "BPG_QR_SCHEME_TAG",
        "BPG_REFERENCE_PREFIX",
        "BPG_AMOUNT_TOLERANCE",
        "BPG_SYNC_LIMIT",
        "BPG_SYNC_INTERVAL_SECS",
        "BPG_SSE_KEEP_ALIVE_SECS",
        "BPG_EVENT_BUFFER_SIZE",
        "BPG_USE_X_FORWARDED_FOR",
        "BPG_USE_FORWARDED",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
