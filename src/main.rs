//! Chainwitness CLI
//!
//! Entry point for the `chainwitness` command-line tool.

use chainwitness::config::{EffectiveConfig, Settings};
use chainwitness::crypto::{AlgorithmRegistry, EncryptedPrivateKey, KeyPair, Signer};
use chainwitness::hashing::artifact_for_file;
use chainwitness::model::{
    ApprovalConfiguration, Artifact, KeyAlgorithm, Layout, LayoutMetaBlock, Link, LinkMetaBlock,
};
use chainwitness::verification::{create_release, VerificationReport, VerificationRequest, Verifier, VerifyError};
use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

/// Exit code: run verified
const EXIT_VALID: i32 = 0;
/// Exit code: run did not verify
const EXIT_INVALID: i32 = 1;
/// Exit code: bad usage, config or I/O
const EXIT_USAGE: i32 = 2;
/// Exit code: cryptographic failure
const EXIT_SECURITY: i32 = 3;
/// Exit code: internal error
const EXIT_INTERNAL: i32 = 4;

#[derive(Parser)]
#[command(name = "chainwitness")]
#[command(about = "Supply-chain provenance signing and verification", version)]
struct Cli {
    /// Project config file (default: .chainwitness.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Log filter directive, e.g. "debug" (overrides RUST_LOG and config)
    #[arg(long, global = true)]
    log_filter: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum AlgorithmArg {
    Ec,
    Ed25519,
}

impl From<AlgorithmArg> for KeyAlgorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Ec => KeyAlgorithm::Ec,
            AlgorithmArg::Ed25519 => KeyAlgorithm::Ed25519,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a key pair
    Keygen {
        #[arg(long, value_enum, default_value = "ec")]
        algorithm: AlgorithmArg,

        /// Directory for <name>.pub.json and <name>.key.json
        #[arg(long)]
        out_dir: PathBuf,

        /// File name stem (default: the key id)
        #[arg(long)]
        name: Option<String>,

        /// Environment variable holding the passphrase
        #[arg(long, default_value = "CHAINWITNESS_PASSPHRASE")]
        passphrase_env: String,
    },

    /// Sign a link document
    SignLink {
        /// Encrypted private key file
        #[arg(long)]
        key: PathBuf,

        /// Unsigned link JSON
        #[arg(long)]
        link: PathBuf,

        #[arg(long)]
        supply_chain: String,

        #[arg(long)]
        out: PathBuf,

        #[arg(long, default_value = "CHAINWITNESS_PASSPHRASE")]
        passphrase_env: String,
    },

    /// Sign a layout, adding to any signatures it already carries
    SignLayout {
        #[arg(long)]
        key: PathBuf,

        /// Layout JSON or signed layout block
        #[arg(long)]
        layout: PathBuf,

        /// Required when signing a bare layout
        #[arg(long)]
        supply_chain: Option<String>,

        #[arg(long)]
        out: PathBuf,

        #[arg(long, default_value = "CHAINWITNESS_PASSPHRASE")]
        passphrase_env: String,
    },

    /// Hash files as artifacts
    Hash {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Treat CRLF and CR as LF
        #[arg(long)]
        normalize_line_endings: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Verify a run
    Verify {
        /// Signed layout block
        #[arg(long)]
        layout: PathBuf,

        /// Signed link blocks
        #[arg(long = "link")]
        links: Vec<PathBuf>,

        /// JSON list of the artifacts about to be released
        #[arg(long)]
        expected: PathBuf,

        /// JSON list of approval configurations
        #[arg(long)]
        approvals: Option<PathBuf>,

        /// Write a verification report here
        #[arg(long)]
        report: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Verify and describe a release
    Release {
        #[arg(long)]
        layout: PathBuf,

        #[arg(long = "link")]
        links: Vec<PathBuf>,

        /// JSON lists of artifacts; their union is released
        #[arg(long = "artifacts", required = true)]
        artifacts: Vec<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let mut overrides = serde_json::Map::new();
    if let Some(filter) = &cli.log_filter {
        overrides.insert("logging".into(), serde_json::json!({ "filter": filter }));
    }
    if cli.log_json {
        let logging = overrides
            .entry("logging")
            .or_insert_with(|| serde_json::json!({}));
        logging["json"] = serde_json::Value::Bool(true);
    }
    let cli_overrides = (!overrides.is_empty()).then(|| serde_json::Value::Object(overrides));

    let config = match EffectiveConfig::discover(cli.config.as_deref(), cli_overrides) {
        Ok(config) => config,
        Err(e) => fail(EXIT_USAGE, format!("Configuration error: {}", e)),
    };

    if let Err(e) = chainwitness::logging::init(&config.settings.logging, cli.log_filter.as_deref()) {
        fail(EXIT_USAGE, format!("Invalid log filter: {}", e));
    }

    let registry = AlgorithmRegistry::with_defaults();

    let code = match cli.command {
        Commands::Keygen {
            algorithm,
            out_dir,
            name,
            passphrase_env,
        } => cmd_keygen(&registry, &config.settings, algorithm.into(), &out_dir, name, &passphrase_env),
        Commands::SignLink {
            key,
            link,
            supply_chain,
            out,
            passphrase_env,
        } => cmd_sign_link(&registry, &config.settings, &key, &link, supply_chain, &out, &passphrase_env),
        Commands::SignLayout {
            key,
            layout,
            supply_chain,
            out,
            passphrase_env,
        } => cmd_sign_layout(&registry, &config.settings, &key, &layout, supply_chain, &out, &passphrase_env),
        Commands::Hash {
            files,
            normalize_line_endings,
            json,
        } => cmd_hash(&config.settings, &files, normalize_line_endings, json),
        Commands::Verify {
            layout,
            links,
            expected,
            approvals,
            report,
            json,
        } => cmd_verify(
            &registry,
            &config,
            &layout,
            &links,
            &expected,
            approvals.as_deref(),
            report.as_deref(),
            json,
        ),
        Commands::Release {
            layout,
            links,
            artifacts,
        } => cmd_release(&registry, &config.settings, &layout, &links, &artifacts),
    };

    process::exit(code);
}

fn fail(code: i32, message: impl AsRef<str>) -> ! {
    eprintln!("{}", message.as_ref());
    process::exit(code);
}

fn passphrase(var: &str) -> String {
    match std::env::var(var) {
        Ok(p) if !p.is_empty() => p,
        _ => fail(EXIT_USAGE, format!("Passphrase variable {} is not set", var)),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path, max_bytes: u64) -> T {
    let size = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) => fail(EXIT_USAGE, format!("Cannot read {}: {}", path.display(), e)),
    };
    if size > max_bytes {
        fail(
            EXIT_USAGE,
            format!("{} is {} bytes, limit is {}", path.display(), size, max_bytes),
        );
    }
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => fail(EXIT_USAGE, format!("Cannot read {}: {}", path.display(), e)),
    };
    match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => fail(EXIT_USAGE, format!("Invalid JSON in {}: {}", path.display(), e)),
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) {
    let json = match serde_json::to_string_pretty(value) {
        Ok(json) => json,
        Err(e) => fail(EXIT_INTERNAL, format!("Error serializing output: {}", e)),
    };
    if let Err(e) = fs::write(path, json) {
        fail(EXIT_USAGE, format!("Cannot write {}: {}", path.display(), e));
    }
}

fn load_private_key(path: &Path) -> EncryptedPrivateKey {
    match EncryptedPrivateKey::from_file(path) {
        Ok(key) => key,
        Err(e) => fail(EXIT_USAGE, format!("Cannot load key {}: {}", path.display(), e)),
    }
}

fn load_links(paths: &[PathBuf], max_bytes: u64) -> Vec<LinkMetaBlock> {
    paths
        .iter()
        .map(|path| match LinkMetaBlock::from_file(path, max_bytes) {
            Ok(block) => block,
            Err(e) => fail(EXIT_USAGE, format!("Cannot load link {}: {}", path.display(), e)),
        })
        .collect()
}

fn load_layout(path: &Path, max_bytes: u64) -> LayoutMetaBlock {
    match LayoutMetaBlock::from_file(path, max_bytes) {
        Ok(block) => block,
        Err(e) => fail(EXIT_USAGE, format!("Cannot load layout {}: {}", path.display(), e)),
    }
}

fn verify_error_exit(e: &VerifyError) -> i32 {
    if e.is_security() {
        EXIT_SECURITY
    } else if e.is_internal() {
        EXIT_INTERNAL
    } else {
        EXIT_USAGE
    }
}

fn cmd_keygen(
    registry: &AlgorithmRegistry,
    settings: &Settings,
    algorithm: KeyAlgorithm,
    out_dir: &Path,
    name: Option<String>,
    passphrase_env: &str,
) -> i32 {
    let passphrase = passphrase(passphrase_env);
    let pair = match KeyPair::generate(registry, algorithm, &passphrase, settings.keys.pbkdf2_iterations) {
        Ok(pair) => pair,
        Err(e) => fail(EXIT_SECURITY, format!("Key generation failed: {}", e)),
    };

    if let Err(e) = fs::create_dir_all(out_dir) {
        fail(EXIT_USAGE, format!("Cannot create {}: {}", out_dir.display(), e));
    }
    let stem = name.unwrap_or_else(|| pair.public_key.key_id.clone());
    let public_path = out_dir.join(format!("{}.pub.json", stem));
    let private_path = out_dir.join(format!("{}.key.json", stem));

    write_json(&public_path, &pair.public_key);
    if let Err(e) = pair.private_key.write_to_file(&private_path) {
        fail(EXIT_USAGE, format!("Cannot write {}: {}", private_path.display(), e));
    }

    println!("{}", pair.public_key.key_id);
    EXIT_VALID
}

fn cmd_sign_link(
    registry: &AlgorithmRegistry,
    settings: &Settings,
    key_path: &Path,
    link_path: &Path,
    supply_chain_id: String,
    out: &Path,
    passphrase_env: &str,
) -> i32 {
    let key = load_private_key(key_path);
    let link: Link = read_json(link_path, settings.verification.max_document_bytes);
    if !link.duplicate_artifacts().is_empty() {
        fail(EXIT_USAGE, "Link lists the same artifact more than once");
    }

    let signature = match Signer::new(registry).sign(&key, &passphrase(passphrase_env), &link) {
        Ok(signature) => signature,
        Err(chainwitness::SignError::Crypto(e)) => fail(EXIT_SECURITY, format!("Signing failed: {}", e)),
        Err(chainwitness::SignError::Canonical(e)) => fail(EXIT_INTERNAL, format!("Signing failed: {}", e)),
    };

    let block = LinkMetaBlock {
        supply_chain_id,
        link,
        signature,
    };
    if let Err(e) = block.write_to_file(out) {
        fail(EXIT_USAGE, format!("Cannot write {}: {}", out.display(), e));
    }
    EXIT_VALID
}

fn cmd_sign_layout(
    registry: &AlgorithmRegistry,
    settings: &Settings,
    key_path: &Path,
    layout_path: &Path,
    supply_chain_id: Option<String>,
    out: &Path,
    passphrase_env: &str,
) -> i32 {
    let key = load_private_key(key_path);
    let value: serde_json::Value = read_json(layout_path, settings.verification.max_document_bytes);

    let mut block = if value.get("layout").is_some() {
        match serde_json::from_value::<LayoutMetaBlock>(value) {
            Ok(block) => block,
            Err(e) => fail(EXIT_USAGE, format!("Invalid layout block: {}", e)),
        }
    } else {
        let layout: Layout = match serde_json::from_value(value) {
            Ok(layout) => layout,
            Err(e) => fail(EXIT_USAGE, format!("Invalid layout: {}", e)),
        };
        let Some(supply_chain_id) = supply_chain_id.clone() else {
            fail(EXIT_USAGE, "--supply-chain is required when signing a bare layout");
        };
        LayoutMetaBlock {
            supply_chain_id,
            layout,
            signatures: Vec::new(),
        }
    };
    if let Some(id) = supply_chain_id {
        if id != block.supply_chain_id {
            fail(
                EXIT_USAGE,
                format!("Layout belongs to supply chain {}, not {}", block.supply_chain_id, id),
            );
        }
    }

    let signature = match Signer::new(registry).sign(&key, &passphrase(passphrase_env), &block.layout) {
        Ok(signature) => signature,
        Err(chainwitness::SignError::Crypto(e)) => fail(EXIT_SECURITY, format!("Signing failed: {}", e)),
        Err(chainwitness::SignError::Canonical(e)) => fail(EXIT_INTERNAL, format!("Signing failed: {}", e)),
    };

    // One slot per key: re-signing replaces the earlier signature.
    block.signatures.retain(|s| s != &signature);
    block.signatures.push(signature);

    if let Err(e) = block.write_to_file(out) {
        fail(EXIT_USAGE, format!("Cannot write {}: {}", out.display(), e));
    }
    EXIT_VALID
}

fn cmd_hash(settings: &Settings, files: &[PathBuf], normalize_flag: bool, json: bool) -> i32 {
    let algorithm = match settings.hash_algorithm() {
        Ok(algorithm) => algorithm,
        Err(e) => fail(EXIT_USAGE, format!("Configuration error: {}", e)),
    };
    let normalize = normalize_flag || settings.hashing.normalize_line_endings;

    let mut artifacts = Vec::with_capacity(files.len());
    for path in files {
        let uri = path.to_string_lossy().replace('\\', "/");
        match artifact_for_file(&uri, path, algorithm, normalize) {
            Ok(artifact) => artifacts.push(artifact),
            Err(e) => fail(EXIT_USAGE, e.to_string()),
        }
    }

    if json {
        match serde_json::to_string_pretty(&artifacts) {
            Ok(out) => println!("{}", out),
            Err(e) => fail(EXIT_INTERNAL, format!("Error serializing output: {}", e)),
        }
    } else {
        for artifact in &artifacts {
            println!("{}  {}", artifact.hash, artifact.uri);
        }
    }
    EXIT_VALID
}

#[allow(clippy::too_many_arguments)]
fn cmd_verify(
    registry: &AlgorithmRegistry,
    config: &EffectiveConfig,
    layout_path: &Path,
    link_paths: &[PathBuf],
    expected_path: &Path,
    approvals_path: Option<&Path>,
    report_path: Option<&Path>,
    json: bool,
) -> i32 {
    let max_bytes = config.settings.verification.max_document_bytes;
    let layout = load_layout(layout_path, max_bytes);
    let links = load_links(link_paths, max_bytes);
    let expected: Vec<Artifact> = read_json(expected_path, max_bytes);
    let approvals: Vec<ApprovalConfiguration> = approvals_path
        .map(|path| read_json(path, max_bytes))
        .unwrap_or_default();

    let request = VerificationRequest::new(&layout, &links, &expected).with_approvals(&approvals);
    let result = match Verifier::new(registry).verify_run(&request) {
        Ok(result) => result,
        Err(e) => fail(verify_error_exit(&e), format!("Verification error: {}", e)),
    };

    let report = VerificationReport::new(&layout.supply_chain_id, &result, config.sources.clone());
    if let Some(path) = report_path {
        if let Err(e) = report.write_to_file(path) {
            fail(EXIT_USAGE, format!("Cannot write report {}: {}", path.display(), e));
        }
    }

    if json {
        match report.to_json() {
            Ok(out) => println!("{}", out),
            Err(e) => fail(EXIT_INTERNAL, format!("Error serializing output: {}", e)),
        }
    } else if result.run_is_valid {
        println!("PASS {}", layout.supply_chain_id);
    } else {
        println!("FAIL {}", layout.supply_chain_id);
        for violation in result.fatal_violations() {
            println!("  {}", violation);
        }
    }

    if result.run_is_valid {
        EXIT_VALID
    } else {
        EXIT_INVALID
    }
}

fn cmd_release(
    registry: &AlgorithmRegistry,
    settings: &Settings,
    layout_path: &Path,
    link_paths: &[PathBuf],
    artifact_paths: &[PathBuf],
) -> i32 {
    let max_bytes = settings.verification.max_document_bytes;
    let layout = load_layout(layout_path, max_bytes);
    let links = load_links(link_paths, max_bytes);
    let artifact_sets: Vec<Vec<Artifact>> = artifact_paths.iter().map(|p| read_json(p, max_bytes)).collect();

    let release = match create_release(&Verifier::new(registry), &layout, &links, &artifact_sets) {
        Ok(release) => release,
        Err(e) => fail(verify_error_exit(&e), format!("Verification error: {}", e)),
    };

    match serde_json::to_string_pretty(&release) {
        Ok(out) => println!("{}", out),
        Err(e) => fail(EXIT_INTERNAL, format!("Error serializing output: {}", e)),
    }

    if release.release_is_valid {
        EXIT_VALID
    } else {
        EXIT_INVALID
    }
}
