#![forbid(unsafe_code)]

//! kista CLI: canonicalize, digest, sign, verify, encrypt and decrypt.

use base64::Engine;
use clap::{Parser, Subcommand};
use kista::names;
use kista_core::Error;
use kista_dsig::{DsigContext, VerifyResult};
use kista_enc::{EncryptedData, EncryptionMethod};
use kista_keys::Key;
use kista_xml::XmlWriter;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "kista", about = "XML Digital Signature and XML Encryption", version)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where verification and signing keys come from.
#[derive(clap::Args)]
struct KeyArgs {
    /// Private key, public key or certificate (PEM or DER)
    #[arg(short = 'k', long)]
    key: Option<PathBuf>,

    /// Raw HMAC secret (binary file)
    #[arg(long = "hmac-key", conflicts_with = "key")]
    hmac_key: Option<PathBuf>,

    /// Additional ID attribute names for `#id` references
    #[arg(long = "id-attr")]
    id_attr: Vec<String>,

    /// Refuse SHA-1 based digests and signatures
    #[arg(long = "reject-sha1")]
    reject_sha1: bool,

    /// Fail when an ID value occurs on more than one element
    #[arg(long = "strict-ids")]
    strict_ids: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Canonicalize an XML document
    C14n {
        file: PathBuf,

        /// c14n, c14n-comments, exc-c14n, exc-c14n-comments or a URI
        #[arg(short, long, default_value = "exc-c14n")]
        mode: String,

        /// InclusiveNamespaces prefixes for the exclusive modes
        #[arg(long, value_delimiter = ' ')]
        prefixes: Vec<String>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Digest a file and print the base64 value
    Digest {
        file: PathBuf,

        /// Digest name (sha256, sha1, ...) or URI
        #[arg(short, long, default_value = "sha256")]
        algorithm: String,

        /// Print hex instead of base64
        #[arg(long)]
        hex: bool,
    },

    /// Fill in a Signature template
    Sign {
        /// Template with empty DigestValue and SignatureValue
        template: PathBuf,

        #[command(flatten)]
        keys: KeyArgs,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify a signed document
    Verify {
        file: PathBuf,

        #[command(flatten)]
        keys: KeyArgs,
    },

    /// Encrypt a file for a recipient
    Encrypt {
        file: PathBuf,

        /// Recipient public key or certificate
        #[arg(short = 'r', long)]
        recipient: PathBuf,

        /// Block cipher for the data
        #[arg(long, default_value = "aes256-gcm")]
        cipher: String,

        /// Key transport for the session key
        #[arg(long, default_value = "rsa-oaep-mgf1p")]
        transport: String,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decrypt an EncryptedData document carrying its EncryptedKey
    Decrypt {
        file: PathBuf,

        /// Recipient private key
        #[arg(short = 'k', long)]
        key: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::C14n {
            file,
            mode,
            prefixes,
            output,
        } => cmd_c14n(&file, &mode, &prefixes, output),
        Commands::Digest {
            file,
            algorithm,
            hex,
        } => cmd_digest(&file, &algorithm, hex),
        Commands::Sign {
            template,
            keys,
            output,
        } => cmd_sign(&template, &keys, output),
        Commands::Verify { file, keys } => cmd_verify(&file, &keys),
        Commands::Encrypt {
            file,
            recipient,
            cipher,
            transport,
            output,
        } => cmd_encrypt(&file, &recipient, &cipher, &transport, output),
        Commands::Decrypt { file, key, output } => cmd_decrypt(&file, &key, output),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn cmd_c14n(
    file: &Path,
    mode: &str,
    prefixes: &[String],
    output: Option<PathBuf>,
) -> Result<(), Error> {
    let xml = std::fs::read_to_string(file)?;
    let mode = names::c14n_mode(mode)?;
    let bytes = kista_c14n::canonicalize_str(&xml, mode, prefixes)?;
    write_output(output, &bytes)
}

fn cmd_digest(file: &Path, algorithm: &str, hex: bool) -> Result<(), Error> {
    let data = std::fs::read(file)?;
    let digest = kista_crypto::digest::digest(names::digest(algorithm)?, &data)?;
    if hex {
        println!("{}", hex::encode(digest));
    } else {
        println!("{}", base64::engine::general_purpose::STANDARD.encode(digest));
    }
    Ok(())
}

fn cmd_sign(template: &Path, keys: &KeyArgs, output: Option<PathBuf>) -> Result<(), Error> {
    let xml = std::fs::read_to_string(template)?;
    let ctx = dsig_context(keys)?;
    tracing::debug!(template = %template.display(), "signing");
    let signed = kista_dsig::sign_template_with_context(&ctx, &xml)?;
    write_output(output, signed.as_bytes())
}

fn cmd_verify(file: &Path, keys: &KeyArgs) -> Result<(), Error> {
    let xml = std::fs::read_to_string(file)?;
    let ctx = dsig_context(keys)?;
    match kista_dsig::verify_signature(&ctx, &xml)? {
        VerifyResult::Valid => {
            println!("OK");
            Ok(())
        }
        VerifyResult::Invalid { reason } => {
            eprintln!("INVALID: {reason}");
            process::exit(1);
        }
    }
}

fn cmd_encrypt(
    file: &Path,
    recipient: &Path,
    cipher: &str,
    transport: &str,
    output: Option<PathBuf>,
) -> Result<(), Error> {
    let plaintext = std::fs::read(file)?;
    let recipient_key = kista_keys::load_key_file(recipient)?;
    let data_method = EncryptionMethod::with_algorithm(names::block_cipher(cipher)?)?;
    let key_method = EncryptionMethod::with_algorithm(names::key_transport(transport)?)?;

    let sealed = kista_enc::seal(&plaintext, data_method, key_method, &recipient_key)?;
    let mut w = XmlWriter::new();
    sealed.data.to_xml(&mut w)?;
    write_output(output, w.into_string()?.as_bytes())
}

fn cmd_decrypt(file: &Path, key: &Path, output: Option<PathBuf>) -> Result<(), Error> {
    let xml = std::fs::read_to_string(file)?;
    let recipient_key = kista_keys::load_key_file(key)?;
    let doc = kista_xml::parse(&xml)?;
    let data = EncryptedData::from_xml(doc.root_element())?;
    let plaintext = kista_enc::open_embedded(&data, &recipient_key)?;
    write_output(output, &plaintext)
}

fn dsig_context(keys: &KeyArgs) -> Result<DsigContext, Error> {
    let key = load_signing_key(keys)?;
    let mut ctx = DsigContext::new(key);
    for attr in &keys.id_attr {
        ctx.add_id_attr(attr);
    }
    ctx.reject_sha1 = keys.reject_sha1;
    ctx.reject_duplicate_ids = keys.strict_ids;
    Ok(ctx)
}

fn load_signing_key(keys: &KeyArgs) -> Result<Key, Error> {
    match (&keys.key, &keys.hmac_key) {
        (Some(path), _) => kista_keys::load_key_file(path),
        (None, Some(path)) => kista_keys::load_symmetric_key_file(path),
        (None, None) => Err(Error::InvalidArgument(
            "a key is required: pass --key or --hmac-key".into(),
        )),
    }
}

fn write_output(path: Option<PathBuf>, data: &[u8]) -> Result<(), Error> {
    match path {
        Some(p) => std::fs::write(p, data)?,
        None => std::io::stdout().write_all(data)?,
    }
    Ok(())
}
