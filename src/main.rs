//! CLI entrypoint for `talon`.
//!
//! Parses command-line arguments, validates and loads the run configuration,
//! wires the Kerberos and LDAP authenticators to the scheduler, and maps each
//! way a run can end to its own exit code.
use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use colored::Colorize;
use log::{LevelFilter, error};
use talon::{
    auth::Dispatch,
    config::{DEFAULT_SLEEP_SECS, Options, RunConfig},
    kerberos::{AsExchangeClient, KerberosAuthenticator},
    ldap::{Ldap3Client, LdapAuthenticator},
    prompt::TerminalOperator,
    report::{render_clock_skew, render_summary},
    scheduler::{RunError, Scheduler},
};

#[derive(Parser, Debug)]
#[command(
    name = "talon",
    version,
    about = "Kerberos and LDAP password spraying and user enumeration"
)]
struct Args {
    /// Domain controller to connect to
    #[arg(short = 'H', long = "host")]
    host: Option<String>,

    /// File containing the list of domain controllers to connect to
    #[arg(long = "hostfile")]
    hostfile: Option<PathBuf>,

    /// Fully qualified domain to use
    #[arg(short = 'D', long = "domain")]
    domain: Option<String>,

    /// Username to authenticate as
    #[arg(short = 'U', long = "user")]
    user: Option<String>,

    /// File containing the list of usernames
    #[arg(long = "userfile")]
    userfile: Option<PathBuf>,

    /// Password to use
    #[arg(short = 'P', long = "password")]
    password: Option<String>,

    /// File to append the results to
    #[arg(short = 'O', long = "output")]
    output: Option<PathBuf>,

    /// Seconds to wait between attempts
    #[arg(long = "sleep", default_value_t = DEFAULT_SLEEP_SECS)]
    sleep: f64,

    /// Enumerate which users are valid
    #[arg(short = 'E', long = "enum")]
    enumerate: bool,

    /// Test against Kerberos only
    #[arg(short = 'K', long = "kerberos")]
    kerberos: bool,

    /// Test against LDAP only
    #[arg(short = 'L', long = "ldap")]
    ldap: bool,

    /// Print debug statements (same as -vv)
    #[arg(long = "debug")]
    debug: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Control color output (auto, always, never)
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    /// Suppress banner and summary
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

const ASCII_TITLE: &str = r#"
 /$$$$$$$$        /$$
|__  $$__/       | $$
   | $$  /$$$$$$ | $$  /$$$$$$  /$$$$$$$
   | $$ |____  $$| $$ /$$__  $$| $$__  $$
   | $$  /$$$$$$$| $$| $$  \ $$| $$  \ $$
   | $$ /$$__  $$| $$| $$  | $$| $$  | $$
   | $$|  $$$$$$$| $$|  $$$$$$/| $$  | $$
   |__/ \_______/|__/ \______/ |__/  |__/
"#;

fn init_logger(verbosity: u8, debug: bool) {
    let level = match (verbosity, debug) {
        (_, true) => LevelFilter::Debug,
        (0, _) => LevelFilter::Warn,
        (1, _) => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}

impl Args {
    fn options(&self) -> Options {
        Options {
            host: self.host.clone(),
            hostfile: self.hostfile.clone(),
            user: self.user.clone(),
            userfile: self.userfile.clone(),
            domain: self.domain.clone(),
            password: self.password.clone(),
            output: self.output.clone(),
            sleep: self.sleep,
            enumerate: self.enumerate,
            kerberos_only: self.kerberos,
            ldap_only: self.ldap,
        }
    }
}

fn main() {
    let args = Args::parse();
    init_logger(args.verbose, args.debug);
    match args.color {
        ColorChoice::Always => {
            colored::control::set_override(true);
        }
        ColorChoice::Never => {
            colored::control::set_override(false);
        }
        ColorChoice::Auto => {}
    }

    if !args.quiet {
        println!("{}", ASCII_TITLE.bold().green());
    }

    let opts = args.options();
    if let Err(e) = opts.validate() {
        error!("{}", e);
        process::exit(2);
    }
    let config = match RunConfig::load(&opts) {
        Ok(config) => config,
        Err(e) => {
            error!("failed to load inputs: {:#}", e);
            process::exit(3);
        }
    };

    let dispatch = Dispatch::new(
        Box::new(KerberosAuthenticator::new(AsExchangeClient, config.enumerate)),
        Box::new(LdapAuthenticator::new(Ldap3Client)),
    );
    let mut scheduler = Scheduler::new(config, dispatch, Box::new(TerminalOperator::stdio()));
    let mut rng = rand::rng();
    let mut stdout = std::io::stdout();

    match scheduler.run(&mut rng, &mut stdout) {
        Ok(summary) => {
            if !args.quiet {
                println!("{}", render_summary(&summary));
            }
        }
        Err(RunError::Auth(e)) => {
            let talon::auth::AuthError::ClockSkew { host } = &e;
            println!("{}", render_clock_skew(host));
            error!("{}", e);
            process::exit(4);
        }
        Err(e @ RunError::Declined { .. }) => {
            error!("{}", e);
            process::exit(5);
        }
        Err(e) => {
            error!("{}", e);
            process::exit(6);
        }
    }
}
