//! Export pipeline: validate, compile, record in the ledger, upload the batch.
use crate::compiler;
use crate::compiler::Compilation;
use crate::error::PvaError;
use crate::ledger;
use crate::schema::SheetName;
use crate::storage::ObjectStorage;
use crate::store::TableStore;
use crate::validator;
use chrono::DateTime;
use chrono::SecondsFormat;
use chrono::Utc;
use rand::Rng;
use std::collections::BTreeMap;
use tracing::info;

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LENGTH: usize = 11;

/// Result of one export run.
#[derive(Debug)]
pub struct Export {
    pub folder: String,
    /// Location of the uploaded `config.json`; `None` when nothing changed.
    pub uploaded: Option<String>,
    pub compilation: Compilation,
}

/// `<ISO-8601 timestamp>-<random base36>`, unique per run.
pub fn folder_name<R: Rng>(now: DateTime<Utc>, rng: &mut R) -> String {
    let suffix: String = (0..SUFFIX_LENGTH)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", now.to_rfc3339_opts(SecondsFormat::Millis, true), suffix)
}

/// Compiles the campaign and hands every new or changed config to `storage`.
///
/// Invalid tables abort the run before anything is written. Otherwise the
/// ledger is updated for every ad group, and the changed configs are uploaded
/// as one pretty-printed JSON array to `<folder>/config.json`.
pub fn export_config(
    store: &mut dyn TableStore,
    storage: &dyn ObjectStorage,
    now: DateTime<Utc>,
) -> Result<Export, PvaError> {
    let tables = validator::load_config_tables(store, &[])?;
    let status = tables.get(&SheetName::Status).map(Vec::as_slice).unwrap_or(&[]);
    let existing = ledger::get_existing(status)?;
    let folder = folder_name(now, &mut rand::thread_rng());

    let compilation = compiler::compile(&tables, &existing)?;
    let errors: BTreeMap<String, String> = compilation
        .errors
        .iter()
        .map(|(ad_group, error)| (ad_group.clone(), error.to_string()))
        .collect();
    ledger::log_ad_groups(
        store,
        &existing,
        &errors,
        &compilation.changed,
        &compilation.unchanged,
        &folder,
        now,
    )?;

    let uploaded = if compilation.batch.is_empty() {
        info!("no changed ad groups, nothing to upload");
        None
    } else {
        let json = serde_json::to_string_pretty(&compilation.batch)?;
        let path = format!("{folder}/config.json");
        let url = storage.upload_file(json.as_bytes(), &path, "application/json")?;
        info!(url = %url, ad_groups = compilation.batch.len(), "uploaded config");
        Some(url)
    };

    Ok(Export {
        folder,
        uploaded,
        compilation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::load_existing;
    use crate::setup;
    use crate::storage::LocalStorage;
    use crate::store::DuckDbStore;
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::Value;
    use std::fs;
    use std::path::PathBuf;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    fn temp_root(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("pva-export-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&root);
        root
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn folder_names_start_with_the_timestamp() {
        let mut rng = StdRng::seed_from_u64(7);
        let name = folder_name(now(), &mut rng);
        let (timestamp, suffix) = name.split_at(24);
        assert_eq!(timestamp, "2024-05-01T10:00:00.000Z");
        assert_eq!(suffix.len(), SUFFIX_LENGTH + 1);
        assert!(suffix[1..].chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_ne!(name, folder_name(now(), &mut rng));
    }

    #[test]
    fn hamburg_end_to_end() {
        let mut store = MemoryStore::new();
        setup::initialise_sheets(&mut store).unwrap();
        store
            .replace(
                "Offers",
                &[strings(&["Offer ID", "Title", "Image", "Price"]), strings(&["1001", "Apples", "https://example.com/a.png", "€1.09"])],
            )
            .unwrap();
        store.append("Offers to AdGroups", &[strings(&["1001", "Hamburg"])]).unwrap();
        store
            .append("AdGroups", &[strings(&["Hamburg", "template.mp4", "VIDEO_RESPONSIVE"])])
            .unwrap();
        store.append("Timing", &[strings(&["template.mp4", "11", "4", "1"])]).unwrap();
        store
            .append(
                "Placement",
                &[strings(&[
                    "1", "price", "Text", "Price", "", "left", "top", "left", "top", "100", "200", "0", "", "", "", "Roboto",
                    "40", "300", "left", "#ffffff", "",
                ])],
            )
            .unwrap();

        let root = temp_root("hamburg");
        let storage = LocalStorage::new(&root);
        let export = export_config(&mut store, &storage, now()).unwrap();
        assert!(export.uploaded.is_some());

        let json: Value = serde_json::from_str(&storage.get_file_text(&format!("{}/config.json", export.folder)).unwrap()).unwrap();
        let configs = json.as_array().unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0]["ad_group"], "Hamburg");
        assert_eq!(configs[0]["content"][0]["offset_s"], 11);
        assert_eq!(configs[0]["content"][0]["placements"][0]["text_value"], "€1.09");

        let hamburg = &load_existing(&store).unwrap()["Hamburg"];
        assert_eq!(hamburg.expected_status, "ENABLED");
        assert_eq!(hamburg.content_checksum.len(), 64);
        assert_eq!(hamburg.gcs_folder, export.folder);
        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn unchanged_campaign_uploads_nothing() {
        let mut store = DuckDbStore::in_memory().unwrap();
        setup::initialise_sheets(&mut store).unwrap();
        setup::populate_example(&mut store).unwrap();
        let root = temp_root("idempotent");
        let storage = LocalStorage::new(&root);

        let first = export_config(&mut store, &storage, now()).unwrap();
        assert_eq!(first.compilation.changed.len(), 2);
        let second = export_config(&mut store, &storage, now()).unwrap();
        assert!(second.uploaded.is_none());
        assert!(second.compilation.batch.is_empty());
        assert_eq!(second.compilation.unchanged.len(), 2);
        assert_eq!(storage.list_files("").unwrap().len(), 1);

        let existing = load_existing(&store).unwrap();
        assert_eq!(existing["Berlin"].gcs_folder, first.folder);

        store.set_cell("Placement", 2, 11, "290").unwrap();
        let third = export_config(&mut store, &storage, now()).unwrap();
        assert_eq!(third.compilation.batch.len(), 2);
        assert_ne!(third.compilation.changed["Hamburg"], first.compilation.changed["Hamburg"]);
        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn per_ad_group_errors_are_recorded() {
        let mut store = MemoryStore::new();
        setup::initialise_sheets(&mut store).unwrap();
        setup::populate_example(&mut store).unwrap();
        store.append("Offers to AdGroups", &[strings(&["1005", "Berlin"])]).unwrap();
        let root = temp_root("errors");
        let storage = LocalStorage::new(&root);

        let export = export_config(&mut store, &storage, now()).unwrap();
        assert_eq!(export.compilation.batch.len(), 1);
        let berlin = &load_existing(&store).unwrap()["Berlin"];
        assert_eq!(berlin.expected_status, "DISABLED");
        assert_eq!(berlin.errors, "Offer mismatch: has 4, needs 3");
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn invalid_tables_abort_before_the_ledger() {
        let mut store = MemoryStore::new();
        setup::initialise_sheets(&mut store).unwrap();
        setup::populate_example(&mut store).unwrap();
        store.set_cell("Timing", 2, 2, "soon").unwrap();
        let storage = LocalStorage::new(temp_root("invalid"));

        let error = export_config(&mut store, &storage, now()).unwrap_err();
        assert!(error.to_string().contains("[Timing] Found invalid value \"soon\" as Offset [s]."));
        assert!(load_existing(&store).unwrap().is_empty());
    }
}
