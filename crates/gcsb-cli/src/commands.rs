use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use colored::Colorize;
use gcsb_browser::{EditorSession, FolderProjection, GcsbConfig};
use gcsb_store::{HttpObjectStore, ObjectStoreClient, StoreConfig};
use gcsb_types::{basename, parent_prefix, BucketName, Credential, DisplayEntry, ObjectMetadata};

use crate::cli::*;

const TOKEN_ENV: &str = "GCSB_TOKEN";

/// Resolved configuration plus the store every command talks to.
struct Session {
    store: Arc<dyn ObjectStoreClient>,
    config: GcsbConfig,
    format: OutputFormat,
}

impl Session {
    fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = match &cli.config {
            Some(path) => GcsbConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => GcsbConfig::default(),
        };
        if let Some(endpoint) = &cli.endpoint {
            let endpoint = StoreConfig::with_endpoint(endpoint);
            config.store.api_base = endpoint.api_base;
            config.store.upload_base = endpoint.upload_base;
        }
        if let Some(bucket) = &cli.bucket {
            config.browser.bucket = Some(bucket.clone());
        }
        let credential = cli
            .token
            .clone()
            .or_else(|| std::env::var(TOKEN_ENV).ok())
            .map(Credential::bearer)
            .unwrap_or_else(Credential::none);
        if !credential.is_valid() {
            tracing::debug!("no token given; requests are sent unauthenticated");
        }
        let store = HttpObjectStore::new(config.store.clone(), credential)?;
        Ok(Self {
            store: Arc::new(store),
            config,
            format: cli.format,
        })
    }

    fn bucket(&self) -> anyhow::Result<BucketName> {
        let name = self
            .config
            .browser
            .bucket
            .clone()
            .ok_or_else(|| anyhow!("no bucket configured; pass --bucket"))?;
        Ok(BucketName::parse(name)?)
    }

    fn projection(&self) -> anyhow::Result<FolderProjection> {
        Ok(FolderProjection::new(
            self.store.clone(),
            self.bucket()?,
            self.config.browser.clone(),
        ))
    }

    /// A projection positioned at the folder holding `keys`, or at the root
    /// when they live in different folders. Nothing is listed.
    fn projection_for(&self, keys: &[String]) -> anyhow::Result<FolderProjection> {
        let mut parents = keys
            .iter()
            .map(|k| parent_prefix(k.strip_suffix('/').unwrap_or(k.as_str())));
        let folder = match parents.next() {
            Some(first) if parents.all(|p| p == first) => first,
            _ => "",
        };
        Ok(FolderProjection::at_prefix(
            self.store.clone(),
            self.bucket()?,
            folder,
            self.config.browser.clone(),
        )?)
    }

    /// A mounted projection positioned at `path` by descending one folder
    /// segment at a time.
    async fn open_folder(&self, path: &str) -> anyhow::Result<FolderProjection> {
        let mut projection = self.projection()?;
        projection.mount().await?;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let id = format!("{}{segment}/", projection.current_path());
            let entry = projection
                .entry(&id)
                .cloned()
                .ok_or_else(|| anyhow!("no such folder: gs://{}/{id}", projection.bucket()))?;
            projection.descend(&entry).await?;
        }
        Ok(projection)
    }

    fn url(&self, key: &str) -> String {
        match &self.config.browser.bucket {
            Some(bucket) => format!("gs://{bucket}/{key}"),
            None => key.to_string(),
        }
    }
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let session = Session::from_cli(&cli)?;
    dispatch(&session, cli.command).await
}

async fn dispatch(session: &Session, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Buckets(args) => cmd_buckets(session, args).await,
        Command::Ls(args) => cmd_ls(session, args).await,
        Command::Stat(args) => cmd_stat(session, args).await,
        Command::Cat(args) => cmd_cat(session, args).await,
        Command::Put(args) => cmd_put(session, args).await,
        Command::Mkdir(args) => cmd_mkdir(session, args).await,
        Command::Mv(args) => cmd_mv(session, args).await,
        Command::Cp(args) => cmd_cp(session, args).await,
        Command::Rm(args) => cmd_rm(session, args).await,
        Command::Get(args) => cmd_get(session, args).await,
        Command::Edit(args) => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text).context("reading stdin")?;
            cmd_edit(session, args, text).await
        }
    }
}

async fn cmd_buckets(session: &Session, args: BucketsArgs) -> anyhow::Result<()> {
    let project = args
        .project
        .or_else(|| session.config.store.project.clone())
        .ok_or_else(|| anyhow!("no project configured; pass --project"))?;
    let buckets = session.store.list_buckets(&project).await?;
    if session.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&buckets)?);
        return Ok(());
    }
    if buckets.is_empty() {
        println!("No buckets in project {}.", project.bold());
    }
    for bucket in &buckets {
        let location = bucket.location.as_deref().unwrap_or("-");
        println!("{}  {}", bucket.name.bold(), location.dimmed());
    }
    Ok(())
}

async fn cmd_ls(session: &Session, args: LsArgs) -> anyhow::Result<()> {
    let projection = session.open_folder(args.path.as_deref().unwrap_or("")).await?;
    if session.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(projection.entries())?);
        return Ok(());
    }
    println!("{}", session.url(&projection.current_path()).cyan());
    if projection.entries().is_empty() {
        println!("  (empty)");
    }
    for entry in projection.entries() {
        print_entry(entry);
    }
    Ok(())
}

fn print_entry(entry: &DisplayEntry) {
    let modified = entry
        .modified
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    if entry.is_dir {
        println!("  {:>10}  {:16}  {}", "-", modified, format!("{}/", entry.name).blue().bold());
    } else {
        println!("  {:>10}  {:16}  {}", entry.size, modified, entry.name);
    }
}

async fn cmd_stat(session: &Session, args: KeyArgs) -> anyhow::Result<()> {
    let bucket = session.bucket()?;
    let metadata = session.store.get_metadata(bucket.as_str(), &args.key).await?;
    print_metadata(session, &metadata)
}

fn print_metadata(session: &Session, metadata: &ObjectMetadata) -> anyhow::Result<()> {
    if session.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(metadata)?);
        return Ok(());
    }
    println!("{}", session.url(&metadata.name).cyan().bold());
    println!("  Size: {}", metadata.size);
    println!("  Generation: {}", metadata.generation);
    if let Some(content_type) = &metadata.content_type {
        println!("  Content type: {content_type}");
    }
    if let Some(updated) = metadata.updated {
        println!("  Updated: {}", updated.to_rfc3339());
    }
    Ok(())
}

async fn cmd_cat(session: &Session, args: KeyArgs) -> anyhow::Result<()> {
    let bucket = session.bucket()?;
    let editor = EditorSession::open_key(
        session.store.clone(),
        bucket.as_str(),
        &args.key,
        session.config.browser.max_edit_bytes,
    )
    .await?;
    print!("{}", editor.text());
    Ok(())
}

/// Split a destination into the folder to open and the name to create in
/// it. A missing destination or one ending in `/` keeps `default_name`.
fn split_target(destination: Option<&str>, default_name: &str) -> (String, String) {
    match destination {
        None => (String::new(), default_name.to_string()),
        Some(folder) if folder.ends_with('/') => (folder.to_string(), default_name.to_string()),
        Some(key) => (parent_prefix(key).to_string(), basename(key).to_string()),
    }
}

async fn cmd_put(session: &Session, args: PutArgs) -> anyhow::Result<()> {
    let local_name = args
        .local
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("{} has no file name", args.local.display()))?;
    let content = std::fs::read(&args.local)
        .with_context(|| format!("reading {}", args.local.display()))?;
    let (folder, name) = split_target(args.key.as_deref(), local_name);
    let mut projection = session.open_folder(&folder).await?;
    let size = content.len();
    projection.upload(&name, content).await?;
    println!("{} Uploaded {} ({size} bytes)", "✓".green().bold(), session.url(&format!("{folder}{name}")).bold());
    Ok(())
}

async fn cmd_mkdir(session: &Session, args: MkdirArgs) -> anyhow::Result<()> {
    let path = args.path.trim_end_matches('/');
    if path.is_empty() {
        bail!("folder name must not be empty");
    }
    let mut projection = session.open_folder(parent_prefix(path)).await?;
    projection.create_folder(basename(path)).await?;
    println!("{} Created {}", "✓".green().bold(), session.url(&format!("{path}/")).bold());
    Ok(())
}

async fn cmd_mv(session: &Session, args: TransferArgs) -> anyhow::Result<()> {
    let folder = parent_prefix(&args.source);
    let target;
    let moved = if args.destination.ends_with('/') {
        target = format!("{}{}", args.destination, basename(&args.source));
        let mut projection = session.open_folder(folder).await?;
        projection.move_into(&args.source, &args.destination).await?
    } else if parent_prefix(&args.destination) == folder {
        target = args.destination.clone();
        let mut projection = session.open_folder(folder).await?;
        projection.change_selection([args.source.as_str()]);
        projection.rename_selected(basename(&args.destination)).await?
    } else {
        target = args.destination.clone();
        let bucket = session.bucket()?;
        session
            .store
            .move_object(bucket.as_str(), &args.source, bucket.as_str(), &target)
            .await?;
        true
    };
    if moved {
        println!("{} Moved {} → {}", "✓".green().bold(), args.source.bold(), target.bold());
    } else {
        println!("{} is already at {}", args.source.bold(), target.bold());
    }
    Ok(())
}

async fn cmd_cp(session: &Session, args: TransferArgs) -> anyhow::Result<()> {
    let bucket = session.bucket()?;
    let target = if args.destination.ends_with('/') {
        format!("{}{}", args.destination, basename(&args.source))
    } else {
        args.destination.clone()
    };
    session
        .store
        .copy(bucket.as_str(), &args.source, bucket.as_str(), &target)
        .await?;
    println!("{} Copied {} → {}", "✓".green().bold(), args.source.bold(), target.bold());
    Ok(())
}

async fn cmd_rm(session: &Session, args: RmArgs) -> anyhow::Result<()> {
    let mut projection = session.projection_for(&args.keys)?;
    projection.change_selection(args.keys.iter().map(String::as_str));
    let deleted = projection.delete_selected(args.recursive).await?;
    println!("{} Deleted {deleted} object(s)", "✓".green().bold());
    println!(
        "  {} now holds {} entries",
        session.url(&projection.current_path()),
        projection.entries().len()
    );
    Ok(())
}

async fn cmd_get(session: &Session, args: GetArgs) -> anyhow::Result<()> {
    let mut projection = session.projection_for(std::slice::from_ref(&args.key))?;
    projection.change_selection([args.key.as_str()]);
    let download = projection.download_selected().await?;
    let local = args.local.unwrap_or_else(|| PathBuf::from(&download.file_name));
    std::fs::write(&local, &download.content)
        .with_context(|| format!("writing {}", local.display()))?;
    println!(
        "{} Downloaded {} → {} ({} bytes)",
        "✓".green().bold(),
        session.url(&download.key).bold(),
        local.display(),
        download.content.len()
    );
    Ok(())
}

async fn cmd_edit(session: &Session, args: KeyArgs, text: String) -> anyhow::Result<()> {
    let bucket = session.bucket()?;
    let mut editor = EditorSession::open_key(
        session.store.clone(),
        bucket.as_str(),
        &args.key,
        session.config.browser.max_edit_bytes,
    )
    .await?;
    editor.set_text(text);
    if !editor.is_dirty() {
        println!("{} unchanged", editor.display_name().bold());
        return Ok(());
    }
    let metadata = editor.save().await?;
    println!("{} Saved {} ({} bytes)", "✓".green().bold(), editor.display_name().bold(), metadata.size);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use gcsb_browser::BrowserConfig;
    use gcsb_store::{InMemoryObjectStore, Operation, StoreCall};

    fn session(keys: &[&str]) -> (Arc<InMemoryObjectStore>, Session) {
        let store = Arc::new(InMemoryObjectStore::with_bucket("b"));
        for key in keys {
            store.insert("b", key, Bytes::from_static(b"body"));
        }
        let config = GcsbConfig {
            browser: BrowserConfig {
                bucket: Some("b".into()),
                ..BrowserConfig::default()
            },
            ..GcsbConfig::default()
        };
        let session = Session {
            store: store.clone(),
            config,
            format: OutputFormat::Text,
        };
        (store, session)
    }

    fn transfer(source: &str, destination: &str) -> TransferArgs {
        TransferArgs {
            source: source.into(),
            destination: destination.into(),
        }
    }

    #[test]
    fn split_target_variants() {
        assert_eq!(split_target(None, "f.txt"), ("".into(), "f.txt".into()));
        assert_eq!(split_target(Some("docs/"), "f.txt"), ("docs/".into(), "f.txt".into()));
        assert_eq!(split_target(Some("docs/g.txt"), "f.txt"), ("docs/".into(), "g.txt".into()));
        assert_eq!(split_target(Some("g.txt"), "f.txt"), ("".into(), "g.txt".into()));
    }

    #[tokio::test]
    async fn open_folder_descends_each_segment() {
        let (_store, session) = session(&["a/b/c.txt"]);
        let projection = session.open_folder("a/b/").await.unwrap();
        assert_eq!(projection.current_path(), "a/b/");
        assert_eq!(projection.chain().len(), 3);
        assert_eq!(projection.entries()[0].name, "c.txt");
    }

    #[tokio::test]
    async fn open_folder_rejects_unknown_folder() {
        let (_store, session) = session(&["a/b/c.txt"]);
        assert!(session.open_folder("a/zzz").await.is_err());
    }

    #[tokio::test]
    async fn missing_bucket_is_reported() {
        let (_store, mut session) = session(&[]);
        session.config.browser.bucket = None;
        assert!(session.bucket().is_err());
    }

    #[tokio::test]
    async fn mkdir_creates_marker() {
        let (store, session) = session(&["a/x"]);
        cmd_mkdir(&session, MkdirArgs { path: "a/new/".into() }).await.unwrap();
        assert!(store.contains("b", "a/new/"));
    }

    #[tokio::test]
    async fn mv_renames_within_folder() {
        let (store, session) = session(&["a/old.txt"]);
        cmd_mv(&session, transfer("a/old.txt", "a/new.txt")).await.unwrap();
        assert_eq!(store.keys("b"), vec!["a/new.txt".to_string()]);
    }

    #[tokio::test]
    async fn mv_into_folder() {
        let (store, session) = session(&["f.txt", "dest/"]);
        cmd_mv(&session, transfer("f.txt", "dest/")).await.unwrap();
        assert!(store.contains("b", "dest/f.txt"));
        assert!(!store.contains("b", "f.txt"));
    }

    #[tokio::test]
    async fn mv_across_folders() {
        let (store, session) = session(&["a/f.txt"]);
        cmd_mv(&session, transfer("a/f.txt", "z/g.txt")).await.unwrap();
        assert_eq!(store.keys("b"), vec!["z/g.txt".to_string()]);
    }

    #[tokio::test]
    async fn cp_keeps_source() {
        let (store, session) = session(&["f.txt"]);
        cmd_cp(&session, transfer("f.txt", "backup/")).await.unwrap();
        assert!(store.contains("b", "f.txt"));
        assert!(store.contains("b", "backup/f.txt"));
    }

    #[tokio::test]
    async fn rm_recursive_folder() {
        let (store, session) = session(&["a/1", "a/2", "keep"]);
        let args = RmArgs {
            keys: vec!["a/".into()],
            recursive: true,
        };
        cmd_rm(&session, args).await.unwrap();
        assert_eq!(store.keys("b"), vec!["keep".to_string()]);
    }

    #[tokio::test]
    async fn rm_refreshes_only_the_parent_folder() {
        let (store, session) = session(&["a/x/1", "a/y", "a/z", "top"]);
        let args = RmArgs {
            keys: vec!["a/y".into(), "a/x/".into()],
            recursive: true,
        };
        cmd_rm(&session, args).await.unwrap();
        assert_eq!(store.keys("b"), vec!["a/z".to_string(), "top".to_string()]);
        assert_eq!(
            store.calls_of(Operation::List).last(),
            Some(&StoreCall::List {
                bucket: "b".into(),
                prefix: "a/".into(),
                delimiter: true,
            })
        );
    }

    #[tokio::test]
    async fn rm_without_flag_follows_configured_recursion() {
        let (store, mut session) = session(&["a/1", "a/2", "keep"]);
        let args = || RmArgs {
            keys: vec!["a/".into()],
            recursive: false,
        };
        assert!(cmd_rm(&session, args()).await.is_err());
        assert!(store.contains("b", "a/1"));

        session.config.browser.recursive_delete = true;
        cmd_rm(&session, args()).await.unwrap();
        assert_eq!(store.keys("b"), vec!["keep".to_string()]);
    }

    #[tokio::test]
    async fn get_writes_download() {
        let (store, session) = session(&["docs/report.csv"]);
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("out.csv");
        let args = GetArgs {
            key: "docs/report.csv".into(),
            local: Some(local.clone()),
        };
        cmd_get(&session, args).await.unwrap();
        assert_eq!(std::fs::read(&local).unwrap(), b"body");
        assert!(store.calls_of(Operation::List).is_empty());
    }

    #[tokio::test]
    async fn edit_replaces_text() {
        let (store, session) = session(&["notes.md"]);
        cmd_edit(&session, KeyArgs { key: "notes.md".into() }, "new body".into())
            .await
            .unwrap();
        assert_eq!(store.content("b", "notes.md").unwrap(), Bytes::from_static(b"new body"));
    }
}
