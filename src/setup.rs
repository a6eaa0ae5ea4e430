//! Creating, populating and removing the sheets of a campaign workbook.
use crate::base_config;
use crate::base_config::ConfigField;
use crate::base_config::ConfigGroup;
use crate::error::PvaError;
use crate::error::ResultMessage;
use crate::schema::ColumnName;
use crate::schema::SheetName;
use crate::store::TableStore;
use tracing::info;

/// Lays out Base Config and creates every tabular sheet with its header row.
///
/// Existing sheets and values are left in place.
pub fn initialise_sheets(store: &mut dyn TableStore) -> Result<(), PvaError> {
    base_config::initialise(store).with_prefix("Initialising Base Config")?;
    for sheet in SheetName::TABULAR {
        store.ensure(sheet.label(), &sheet.header())?;
    }
    info!("initialised sheets");
    Ok(())
}

const ASSETS: &str = "https://raw.githubusercontent.com/google/product_video_ads/main/example_assets";

fn example_rows(sheet: SheetName) -> Vec<Vec<String>> {
    let rows: Vec<Vec<&str>> = match sheet {
        SheetName::Timing => vec![
            vec!["template.mp4", "11", "4", "1"],
            vec!["template.mp4", "15", "5", "1"],
            vec!["template.mp4", "20", "4", "1"],
        ],
        SheetName::Placement => vec![
            vec![
                "1", "price", "Text", "Price", "", "left", "top", "left", "top", "1050", "280", "0", "", "", "", "",
                "100", "400", "left", "#0088ff", "",
            ],
            vec![
                "1", "image", "Image", "Image", "", "left", "top", "left", "top", "750", "600", "0", "1000", "1000",
                "Yes", "", "", "", "", "", "No",
            ],
            vec![
                "1", "title", "Text", "Title", "", "left", "top", "left", "top", "60", "50", "0", "", "", "", "",
                "120", "400", "left", "#ff8800", "",
            ],
        ],
        SheetName::Offers => {
            let offers = [
                ("1001", "Apples", "apples", "€1.09"),
                ("1002", "Bananas", "bananas", "€2.09"),
                ("1003", "Broccoli", "broccoli", "€1.59"),
                ("1004", "Oranges", "oranges", "€1.29"),
                ("1005", "Papayas", "papayas", "€2.29"),
                ("1006", "Watermelon", "watermelon", "€2.89"),
                ("1007", "Pineapple", "pineapple", "€1.49"),
                ("1008", "Dragonfruits", "dragonfruits", "€1.99"),
            ];
            return offers
                .iter()
                .map(|(id, title, asset, price)| {
                    vec![id.to_string(), title.to_string(), format!("{ASSETS}/{asset}.png"), price.to_string()]
                })
                .collect();
        }
        SheetName::OffersToAdGroups => vec![
            vec!["1001", "Hamburg"],
            vec!["1002", "Hamburg"],
            vec!["1003", "Hamburg"],
            vec!["1001", "Berlin"],
            vec!["1002", "Berlin"],
            vec!["1004", "Berlin"],
        ],
        SheetName::AdGroups => vec![
            vec![
                "Hamburg",
                "template.mp4",
                "VIDEO_RESPONSIVE",
                "",
                "",
                "https://www.google.de/",
                "Zugreifen",
                "Frische Angebote",
                "Frische Angebote Jeden Tag",
                "Lebensmittel, Ersparnisse und mehr.",
                "",
            ],
            vec![
                "Berlin",
                "template.mp4",
                "VIDEO_RESPONSIVE",
                "",
                "",
                "https://www.google.de/",
                "Zugreifen",
                "Jetzt Sparen",
                "Supermarkt Angebote der Woche",
                "Riesige Auswahl, kleine Preise.",
                "",
            ],
        ],
        _ => Vec::new(),
    };
    rows.into_iter()
        .map(|row| row.into_iter().map(str::to_owned).collect())
        .collect()
}

/// Fills the sheets with a small grocery campaign of two ad groups sharing one template.
///
/// Requires initialised sheets; existing data rows of the filled sheets are replaced.
pub fn populate_example(store: &mut dyn TableStore) -> Result<(), PvaError> {
    base_config::set_config_value(
        store,
        ConfigGroup::MerchantCenter,
        ConfigField::FilterFeed,
        base_config::ONLY_MAPPED,
    )?;
    let offer_header: Vec<String> = [ColumnName::OfferId.label(), "Title", "Image", "Price"]
        .into_iter()
        .map(str::to_owned)
        .collect();
    store.replace(SheetName::Offers.label(), &[offer_header])?;

    for sheet in [
        SheetName::Timing,
        SheetName::Placement,
        SheetName::Offers,
        SheetName::OffersToAdGroups,
        SheetName::AdGroups,
    ] {
        store.clear(sheet.label()).with_prefix(&format!("Populating {sheet}"))?;
        store.append(sheet.label(), &example_rows(sheet))?;
    }
    info!("populated example campaign");
    Ok(())
}

/// Removes every sheet together with its named ranges.
pub fn delete_all_sheets(store: &mut dyn TableStore) -> Result<(), PvaError> {
    let names = store.sheet_names()?;
    for name in &names {
        store.delete(name)?;
    }
    info!(count = names.len(), "deleted sheets");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DuckDbStore;
    use crate::store::MemoryStore;
    use crate::validator::load_config_tables;

    #[test]
    fn initialise_creates_every_sheet() {
        let mut store = MemoryStore::new();
        initialise_sheets(&mut store).unwrap();
        let names = store.sheet_names().unwrap();
        assert_eq!(names[0], "Base Config");
        for sheet in SheetName::TABULAR {
            assert_eq!(store.read(sheet.label()).unwrap().header(), sheet.header().as_slice());
        }
        assert_eq!(store.named_ranges().unwrap().len(), 6);
    }

    #[test]
    fn example_campaign_is_valid() {
        let mut store = DuckDbStore::in_memory().unwrap();
        initialise_sheets(&mut store).unwrap();
        populate_example(&mut store).unwrap();
        populate_example(&mut store).unwrap();

        let tables = load_config_tables(&store, &[]).unwrap();
        assert_eq!(tables[&SheetName::Timing].len(), 3);
        assert_eq!(tables[&SheetName::Offers].len(), 8);
        assert_eq!(tables[&SheetName::Offers][0].get("Price"), Some("€1.09"));
        assert_eq!(tables[&SheetName::AdGroups].len(), 2);
        assert_eq!(
            base_config::config_value(&store, ConfigGroup::MerchantCenter, ConfigField::FilterFeed).unwrap(),
            "only mapped"
        );
    }

    #[test]
    fn populate_requires_initialised_sheets() {
        let mut store = MemoryStore::new();
        assert!(populate_example(&mut store).is_err());
    }

    #[test]
    fn delete_removes_sheets_and_ranges() {
        let mut store = MemoryStore::new();
        initialise_sheets(&mut store).unwrap();
        delete_all_sheets(&mut store).unwrap();
        assert!(store.sheet_names().unwrap().is_empty());
        assert!(store.named_ranges().unwrap().is_empty());
    }
}
