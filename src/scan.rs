use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scansheet::application::{BatchOrchestrator, ReviewStore, SavePayload, SheetService};
use scansheet::domain::{mime_from_path, Document, Schema, SessionContext};
use scansheet::infrastructure::{AppConfig, GoogleSheetsStore, HttpExtractionClient};

/// Extracts records from scanned documents through an extraction endpoint,
/// a few documents at a time.
#[derive(Debug, Parser)]
#[command(name = "scan", version, about)]
struct Cli {
    /// Photos or PDFs to process.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Field names, comma separated.
    #[arg(long, value_delimiter = ',', required_unless_present = "sheet")]
    headers: Vec<String>,

    /// Spreadsheet URL; its first row supplies the field names when
    /// `--headers` is not given.
    #[arg(long)]
    sheet: Option<String>,

    #[arg(long)]
    endpoint: Option<String>,

    /// Documents dispatched together.
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Append the extracted records to `--sheet`.
    #[arg(long, requires = "sheet")]
    save: bool,

    #[arg(long, env = "GOOGLE_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scan=info,scansheet=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load()?;
    if let Some(endpoint) = &cli.endpoint {
        config.config.extraction.endpoint = endpoint.clone();
    }
    if let Some(chunk_size) = cli.chunk_size {
        config.config.batch.chunk_size = chunk_size;
    }
    config.validate()?;

    let session = cli.token.as_deref().map(SessionContext::new);
    let sheets = SheetService::new(Arc::new(GoogleSheetsStore::new(&config.config.sheets)?));

    let schema = if cli.headers.is_empty() {
        let (Some(url), Some(session)) = (&cli.sheet, &session) else {
            bail!("--sheet needs an access token (--token or GOOGLE_ACCESS_TOKEN)");
        };
        Schema::new(sheets.headers(session, url).await?.headers)?
    } else {
        Schema::new(cli.headers.iter().map(|h| h.trim()))?
    };

    let documents = read_documents(&cli.files).await?;
    let extractor = Arc::new(HttpExtractionClient::new(&config.config.extraction)?);
    let orchestrator = BatchOrchestrator::with_chunk_size(extractor, config.config.batch.chunk_size);
    info!(
        documents = documents.len(),
        fields = schema.len(),
        endpoint = %config.config.extraction.endpoint,
        "starting batch"
    );

    let report = orchestrator
        .run_batch(documents, &schema, |percent| info!(progress = percent, "batch progress"))
        .await?;

    for failed in report.failures.iter() {
        warn!(document = %failed.name, reason = %failed.message, "document skipped");
    }
    println!("{}", serde_json::to_string_pretty(&report.records)?);

    if cli.save {
        let (Some(url), Some(session)) = (&cli.sheet, &session) else {
            bail!("--save needs --sheet and an access token");
        };
        let review = ReviewStore::new(schema, report.records);
        let rows = sheets
            .save(session, url, SavePayload::Many(review.commit()?))
            .await?;
        info!(rows, "records appended to sheet");
    }

    Ok(())
}

/// Unknown extensions are kept; the extractor reports them as failures.
async fn read_documents(paths: &[PathBuf]) -> anyhow::Result<Vec<Document>> {
    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let content = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = mime_from_path(path).unwrap_or(mime::APPLICATION_OCTET_STREAM);
        documents.push(Document::new(name, mime_type, content));
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_accepts_headers_list() {
        let cli = Cli::try_parse_from(["scan", "a.png", "b.pdf", "--headers", "Nama,Tanggal"]).unwrap();
        assert_eq!(cli.files.len(), 2);
        assert_eq!(cli.headers, vec!["Nama", "Tanggal"]);
        assert!(!cli.save);
    }

    #[test]
    fn test_cli_requires_a_field_source() {
        assert!(Cli::try_parse_from(["scan", "a.png"]).is_err());
        assert!(Cli::try_parse_from(["scan", "a.png", "--headers", "A", "--save"]).is_err());
        assert!(Cli::try_parse_from([
            "scan",
            "a.png",
            "--sheet",
            "https://docs.google.com/spreadsheets/d/x/edit",
            "--save"
        ])
        .is_ok());
    }

    #[tokio::test]
    async fn test_read_documents_guesses_mime() {
        let dir = std::env::temp_dir().join(format!("scan-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let png = dir.join("ktp.PNG");
        let txt = dir.join("notes.txt");
        std::fs::write(&png, b"png").unwrap();
        std::fs::write(&txt, b"txt").unwrap();

        let documents = read_documents(&[png, txt]).await.unwrap();
        assert_eq!(documents[0].name(), "ktp.PNG");
        assert_eq!(documents[0].mime_type(), &mime::IMAGE_PNG);
        assert!(!documents[1].is_supported());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
