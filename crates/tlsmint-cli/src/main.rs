//! tlsmint CLI: manage the trust root and mint certificates from the shell.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tlsmint_certgen::RootPaths;
use tlsmint_codec::{Certificate, NameComponent};
use tlsmint_store::setup::{load_config, open_store};
use tlsmint_store::Identity;

#[derive(Parser)]
#[command(
    name = "tlsmint",
    about = "Issue TLS certificates on demand from a local trust root",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load or create the trust root and show where it is stored.
    Init,

    /// Issue a leaf certificate and print it as PEM.
    Issue {
        /// Subject common name.
        common_name: Option<String>,

        /// Subject alternative name; DNS name or IP literal. Repeatable.
        #[arg(short, long = "san")]
        sans: Vec<String>,

        /// Also print the private key.
        #[arg(long)]
        with_key: bool,

        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the fields of each certificate in a PEM file.
    Inspect {
        /// PEM file to read.
        file: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            let config = load_config(cli.config.as_deref())?;
            let store = open_store(&config)?;
            let root = store.root();
            let paths = RootPaths::new(&config.store.directory, &config.store.label);

            println!("Root:        {}", format_name(root.certificate().subject()));
            println!("Fingerprint: {}", root.certificate().fingerprint());
            println!("Expires:     {}", root.certificate().not_after());
            println!("CA bundle:   {}", paths.ca_pem.display());
            println!("Certificate: {}", paths.cert_pem.display());
            println!("             {}", paths.cert_cer.display());
            println!("             {}", paths.cert_p12.display());
            println!("PKCS#12:     {}", paths.ca_p12.display());
            println!(
                "DH params:   {} ({} bits)",
                paths.dhparam.display(),
                root.dh_params().prime_bits()
            );
        }
        Commands::Issue {
            common_name,
            sans,
            with_key,
            output,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let store = open_store(&config)?;
            let identity = Identity::new(
                common_name.map(String::into_bytes),
                sans.into_iter().map(String::into_bytes).collect(),
            );
            tracing::info!(identity = ?identity, "issuing certificate");
            let entry = store.lookup(&identity)?;

            let mut pem = entry.certificate().to_pem();
            if with_key {
                pem.push_str(&entry.private_key().to_pem());
            }
            match output {
                Some(path) => {
                    std::fs::write(&path, &pem)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Certificate: {}", path.display());
                    println!("Fingerprint: {}", entry.certificate().fingerprint());
                }
                None => print!("{pem}"),
            }
        }
        Commands::Inspect { file } => {
            let raw = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            for (i, certificate) in Certificate::all_from_pem(&raw)?.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                print_certificate(certificate);
            }
        }
    }

    Ok(())
}

fn print_certificate(certificate: &Certificate) {
    let key = certificate.key_info();
    println!("Subject:     {}", format_name(certificate.subject()));
    println!("Issuer:      {}", format_name(certificate.issuer()));
    println!("Serial:      {}", hex(certificate.serial()));
    println!("Not before:  {}", certificate.not_before());
    println!("Not after:   {}", certificate.not_after());
    if certificate.has_expired() {
        println!("             (expired)");
    }
    println!("Key:         {} {} bits", key.algorithm, key.bits);
    for name in certificate.alt_names() {
        println!("SAN:         {}", String::from_utf8_lossy(name));
    }
    println!("Fingerprint: {}", certificate.fingerprint());
}

fn format_name(components: &[NameComponent]) -> String {
    components
        .iter()
        .map(|c| format!("{}={}", c.short_name, String::from_utf8_lossy(&c.value)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
