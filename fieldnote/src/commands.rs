use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use fieldnote_client::{ApiClient, FilePart, MultipartPayload, NewConference, NewVendor, ResponseBody};
use fieldnote_config::{ConfigStore, ConfigUpdate};
use fieldnote_upload::media::guess_content_type;
use fieldnote_upload::payload::{AUDIO, IMAGES};
use fieldnote_upload::{AudioClip, EntityRequest, EntityResolver, Enrichment, ImageFile, SessionDraft, Uploader};
use jiff::Timestamp;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::args::{Command, ConferenceAction, ConfigAction, EntityArgs, SetArgs, UploadArgs, VendorAction};

pub async fn run(command: Command, api: ApiClient) -> Result<()> {
    match command {
        Command::Config { action } => config(action, api.http().config()),
        Command::Health => print_json(&api.health().await?),
        Command::Conferences { action } => conferences(&api, action).await,
        Command::Vendors { action } => vendors(&api, action).await,
        Command::Resolve(entities) => {
            let resolved = EntityResolver::new(api)
                .ensure_conference_and_vendor(&entity_request(entities))
                .await?;
            println!("conference {}", resolved.conference_id);
            println!("vendor     {}", resolved.vendor_id);
            Ok(())
        }
        Command::Upload(args) => upload(&Uploader::new(api), args).await,
        Command::Attach { session_id, files } => {
            let payload = attachments(&files).await?;
            print_json(&api.add_files(&session_id, payload).await?.into_json()?)
        }
        Command::Session { session_id } => {
            let session = api.get_session(&session_id).await?;
            println!("status: {}", session.status());
            print_json(&session)
        }
        Command::Report { session_id, output } => {
            let report = api.get_session_report(&session_id).await?;
            write_report(report, output.as_deref()).await
        }
    }
}

fn config(action: ConfigAction, store: &ConfigStore) -> Result<()> {
    let current = match action {
        ConfigAction::Show => store.get()?,
        ConfigAction::Set(args) => {
            let update = config_update(args);
            if update.is_empty() {
                bail!("nothing to change; pass at least one setting");
            }
            let saved = store.update(update)?;
            if let Some(path) = store.path() {
                println!("saved {}", path.display());
            }
            saved
        }
    };

    let mut shown = (*current).clone();
    if !shown.api_key.expose_secret().is_empty() {
        shown.api_key = SecretString::from("********");
    }
    print!("{}", toml::to_string_pretty(&shown).context("failed to render configuration")?);

    Ok(())
}

fn config_update(args: SetArgs) -> ConfigUpdate {
    ConfigUpdate {
        api_base_url: args.api_base_url,
        api_key: args.api_key.map(SecretString::from),
        auth_mode: args.auth_mode,
        auth_header: args.auth_header,
        auth_query_param: args.auth_query_param,
        strategy: args.strategy,
        primary_encoding: args.primary_encoding,
        enrichment_route: args.enrichment_route,
        enrich: args.enrich,
        poll_attempts: args.poll_attempts,
        poll_interval: args.poll_interval,
        log_capacity: args.log_capacity,
    }
}

async fn conferences(api: &ApiClient, action: ConferenceAction) -> Result<()> {
    match action {
        ConferenceAction::List => print_json(&api.list_conferences().await?),
        ConferenceAction::Create { name, start, end } => {
            let start_date = start.unwrap_or_else(|| jiff::Zoned::now().date());
            let end_date = end.unwrap_or(start_date);
            if end_date < start_date {
                bail!("conference cannot end ({end_date}) before it starts ({start_date})");
            }

            let created = api
                .create_conference(&NewConference {
                    name,
                    start_date,
                    end_date,
                })
                .await?;
            print_json(&created)
        }
    }
}

async fn vendors(api: &ApiClient, action: VendorAction) -> Result<()> {
    match action {
        VendorAction::List { conference: None } => print_json(&api.list_vendors().await?),
        VendorAction::List {
            conference: Some(conference_id),
        } => print_json(&api.list_vendors_for_conference(&conference_id).await?),
        VendorAction::Create { name, conference } => {
            let created = api
                .create_vendor(&NewVendor {
                    name,
                    conference_id: conference,
                })
                .await?;
            print_json(&created)
        }
        VendorAction::Get { vendor_id } => print_json(&api.get_vendor(&vendor_id).await?),
    }
}

fn entity_request(args: EntityArgs) -> EntityRequest {
    EntityRequest {
        conference_id: args.conference,
        vendor_id: args.vendor,
        preferred_vendor_name: args.vendor_name,
    }
}

async fn upload(uploader: &Uploader, args: UploadArgs) -> Result<()> {
    let mut draft = SessionDraft::new(args.started_at.unwrap_or_else(Timestamp::now)).notes(args.notes);
    draft.conference_id = args.entities.conference;
    draft.vendor_id = args.entities.vendor;
    draft.vendor_name = args.entities.vendor_name;
    draft.ended_at = args.ended_at;
    draft.recording_duration = args.duration;

    if let Some(path) = &args.audio {
        let bytes = read(path).await?;
        draft = draft.audio(AudioClip::new(bytes, args.audio_type, file_name(path)));
    }

    for path in &args.images {
        draft = draft.image(ImageFile::new(read(path).await?, file_name(path)));
    }

    let outcome = uploader.upload(draft).await.context("upload failed")?;

    println!("uploaded session {}", outcome.session_id);
    println!(
        "conference {} / vendor {}",
        outcome.entities.conference_id, outcome.entities.vendor_id
    );
    if outcome.used_fallback() {
        println!("note: primary upload was rejected; the fallback succeeded");
    }
    match &outcome.enrichment {
        Enrichment::Triggered => println!("enrichment requested"),
        Enrichment::Skipped => {}
        Enrichment::Failed(e) => println!("warning: {e}"),
    }
    if let Some(status) = &outcome.status {
        println!("status: {status}");
    }

    Ok(())
}

/// Multipart body for `attach`; audio goes under `audio`, everything else
/// under `images`
async fn attachments(paths: &[PathBuf]) -> Result<MultipartPayload> {
    let mut payload = MultipartPayload::new();

    for path in paths {
        let bytes = read(path).await?;
        let filename = file_name(path);
        let content_type = guess_content_type(&filename);

        let part = if content_type.starts_with("audio/") {
            let clip = AudioClip::new(bytes, Some(content_type), filename).normalized();
            FilePart {
                name: AUDIO.to_owned(),
                content_type: clip.effective_content_type(),
                filename: clip.filename,
                bytes: clip.bytes,
            }
        } else {
            FilePart {
                name: IMAGES.to_owned(),
                filename,
                content_type,
                bytes: bytes.into(),
            }
        };

        payload = payload.file(part);
    }

    Ok(payload)
}

async fn write_report(report: ResponseBody, output: Option<&Path>) -> Result<()> {
    let bytes = match (report, output) {
        (ResponseBody::Json(value), _) => serde_json::to_vec_pretty(&value)?,
        (ResponseBody::Text(text), _) => text.into_bytes(),
        (ResponseBody::Blob { bytes, .. }, Some(_)) => bytes.to_vec(),
        (ResponseBody::Blob { content_type, bytes }, None) => {
            bail!("report is binary ({content_type}, {} bytes); pass --output", bytes.len())
        }
    };

    match output {
        Some(path) => {
            tokio::fs::write(path, &bytes)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("wrote {}", path.display());
        }
        None => println!("{}", String::from_utf8_lossy(&bytes)),
    }

    Ok(())
}

async fn read(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
