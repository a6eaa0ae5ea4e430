//! # Feed Import
//!
//! Copies products from Merchant Center into the Offers Feed sheet. Each
//! header of that sheet is a dot path into the product resource, so adding a
//! column such as `shipping.0.price.value` pulls in another attribute.
use crate::base_config;
use crate::base_config::ConfigField;
use crate::base_config::ConfigGroup;
use crate::error::PvaError;
use crate::schema::ColumnName;
use crate::schema::SheetName;
use crate::store::TableStore;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::debug;
use tracing::info;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Object has no key \"{0}\".")]
    MissingKey(String),

    #[error("Object has no string at key \"{0}\".")]
    NotAString(String),

    #[error("Listing products of merchant {merchant_id} failed with HTTP status {status}")]
    ListError { merchant_id: String, status: u16 },

    #[error("No Merchant Center account ID configured")]
    MissingAccount,
}

/// Headers of a freshly created Offers Feed sheet.
pub const DEFAULT_FEED_HEADERS: [&str; 5] = ["offerId", "title", "imageLink", "price.value", "price.currency"];

const BASE_URL: &str = "https://shoppingcontent.googleapis.com";
const MAX_RESULTS: &str = "250";

/// One page of product resources.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    #[serde(default, rename = "resources")]
    pub products: Vec<Value>,
    pub next_page_token: Option<String>,
}

pub trait ProductSource {
    fn list_products(&self, merchant_id: &str, page_token: Option<&str>) -> Result<ProductPage, PvaError>;
}

/// Content API for Shopping v2.1 client.
pub struct MerchantCenterClient {
    client: Client,
    base_url: String,
    token: String,
}

impl MerchantCenterClient {
    pub fn new(token: &str) -> Self {
        MerchantCenterClient {
            client: Client::new(),
            base_url: BASE_URL.to_owned(),
            token: token.to_owned(),
        }
    }
}

impl ProductSource for MerchantCenterClient {
    fn list_products(&self, merchant_id: &str, page_token: Option<&str>) -> Result<ProductPage, PvaError> {
        let url = format!("{}/content/v2.1/{}/products", self.base_url, merchant_id);
        let mut request = self
            .client
            .get(url)
            .query(&[("maxResults", MAX_RESULTS)])
            .bearer_auth(&self.token);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }
        let response = request.send()?;
        if !response.status().is_success() {
            return Err(FeedError::ListError {
                merchant_id: merchant_id.to_owned(),
                status: response.status().as_u16(),
            }
            .into());
        }
        Ok(response.json()?)
    }
}

/// Follows the dot path `field` into `product` and returns the first string met on the way.
pub fn deep_value(product: &Value, field: &str) -> Result<String, FeedError> {
    let mut pointer = product;
    for key in field.split('.') {
        pointer = match pointer {
            Value::Object(map) => map.get(key).unwrap_or(&Value::Null),
            Value::Array(items) => key.parse::<usize>().ok().and_then(|index| items.get(index)).unwrap_or(&Value::Null),
            _ => return Err(FeedError::MissingKey(key.to_owned())),
        };
        if let Value::String(value) = pointer {
            return Ok(value.clone());
        }
    }
    Err(FeedError::NotAString(field.to_owned()))
}

fn prepare_feed_sheet(store: &mut dyn TableStore) -> Result<Vec<String>, PvaError> {
    let sheet = SheetName::OffersFeed.label();
    if store.exists(sheet)? {
        store.clear(sheet)?;
    } else {
        let header: Vec<String> = DEFAULT_FEED_HEADERS.iter().map(|name| name.to_string()).collect();
        store.ensure(sheet, &header)?;
    }
    let mut header = store.read(sheet)?.header().to_vec();
    while header.last().map(String::is_empty).unwrap_or(false) {
        header.pop();
    }
    Ok(header)
}

/// Offer ids referenced by OffersToAdGroups when only mapped offers are to be imported.
fn mapped_offer_ids(store: &mut dyn TableStore) -> Result<Option<BTreeSet<String>>, PvaError> {
    let filter = base_config::config_value(store, ConfigGroup::MerchantCenter, ConfigField::FilterFeed)?;
    if filter != base_config::ONLY_MAPPED {
        return Ok(None);
    }
    let sheet = SheetName::OffersToAdGroups;
    let table = store.ensure(sheet.label(), &sheet.header())?;
    let ids = table
        .records(&sheet.header())
        .iter()
        .map(|record| record.value(ColumnName::OfferId).to_owned())
        .collect();
    Ok(Some(ids))
}

/// Replaces the rows of Offers Feed with the merchant's products and returns how many were written.
pub fn import_feed(store: &mut dyn TableStore, source: &dyn ProductSource) -> Result<usize, PvaError> {
    let merchant_id = base_config::config_value(store, ConfigGroup::MerchantCenter, ConfigField::AccountId)?;
    if merchant_id.is_empty() {
        return Err(FeedError::MissingAccount.into());
    }
    let header = prepare_feed_sheet(store)?;
    let mapped = mapped_offer_ids(store)?;

    let mut imported = 0;
    let mut page_token: Option<String> = None;
    loop {
        let page = source.list_products(&merchant_id, page_token.as_deref())?;
        let mut rows = Vec::new();
        for product in &page.products {
            if let Some(ids) = &mapped {
                let offer_id = product.get("offerId").and_then(Value::as_str).unwrap_or("");
                if !ids.contains(offer_id) {
                    continue;
                }
            }
            let row = header
                .iter()
                .map(|field| deep_value(product, field))
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(row);
        }
        debug!(products = page.products.len(), kept = rows.len(), "feed page");
        imported += rows.len();
        store.append(SheetName::OffersFeed.label(), &rows)?;
        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }
    info!(merchant_id = %merchant_id, imported, "imported feed");
    Ok(imported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::cell::RefCell;

    struct FakeSource {
        pages: Vec<ProductPage>,
        requests: RefCell<Vec<(String, Option<String>)>>,
    }

    impl ProductSource for FakeSource {
        fn list_products(&self, merchant_id: &str, page_token: Option<&str>) -> Result<ProductPage, PvaError> {
            let mut requests = self.requests.borrow_mut();
            requests.push((merchant_id.to_owned(), page_token.map(str::to_owned)));
            let page = &self.pages[requests.len() - 1];
            Ok(ProductPage {
                products: page.products.clone(),
                next_page_token: page.next_page_token.clone(),
            })
        }
    }

    fn product(id: &str, title: &str) -> Value {
        json!({
            "offerId": id,
            "title": title,
            "imageLink": format!("https://example.com/{id}.png"),
            "price": {"value": "1.09", "currency": "EUR"},
            "shipping": [{"country": "DE"}],
        })
    }

    fn source() -> FakeSource {
        FakeSource {
            pages: vec![
                ProductPage {
                    products: vec![product("1001", "Apples"), product("2001", "Plums")],
                    next_page_token: Some("p2".to_owned()),
                },
                ProductPage {
                    products: vec![product("1002", "Bananas")],
                    next_page_token: None,
                },
            ],
            requests: RefCell::new(Vec::new()),
        }
    }

    fn store(filter: &str) -> MemoryStore {
        let mut store = MemoryStore::new();
        setup::initialise_sheets(&mut store).unwrap();
        base_config::set_config_value(&mut store, ConfigGroup::MerchantCenter, ConfigField::AccountId, "42").unwrap();
        base_config::set_config_value(&mut store, ConfigGroup::MerchantCenter, ConfigField::FilterFeed, filter)
            .unwrap();
        let rows = vec![
            vec!["1001".to_owned(), "Hamburg".to_owned()],
            vec!["1002".to_owned(), "Berlin".to_owned()],
        ];
        store.append("Offers to AdGroups", &rows).unwrap();
        store
    }

    #[test]
    fn deep_values_follow_dot_paths() {
        let value = product("1001", "Apples");
        assert_eq!(deep_value(&value, "price.value").unwrap(), "1.09");
        assert_eq!(deep_value(&value, "shipping.0.country").unwrap(), "DE");
        assert_eq!(deep_value(&value, "title.length").unwrap(), "Apples");
        assert_eq!(deep_value(&value, "price").unwrap_err().to_string(), "Object has no string at key \"price\".");
        assert!(matches!(deep_value(&json!({"a": 1}), "a.b"), Err(FeedError::MissingKey(key)) if key == "b"));
    }

    #[test]
    fn only_mapped_offers_are_imported() {
        let mut store = store("only mapped");
        let source = source();
        assert_eq!(import_feed(&mut store, &source).unwrap(), 2);

        let table = store.read("Offers Feed").unwrap();
        assert_eq!(table.header(), DEFAULT_FEED_HEADERS.map(str::to_owned).as_slice());
        assert_eq!(table.data().len(), 2);
        assert_eq!(table.cell(2, 1), "1001");
        assert_eq!(table.cell(3, 2), "Bananas");
        assert_eq!(table.cell(3, 5), "EUR");
        assert_eq!(
            *source.requests.borrow(),
            vec![("42".to_owned(), None), ("42".to_owned(), Some("p2".to_owned()))]
        );
    }

    #[test]
    fn reimport_replaces_rows_and_keeps_custom_headers() {
        let mut store = store("");
        store
            .replace("Offers Feed", &[vec!["offerId".to_owned(), "price.currency".to_owned()], vec!["old".to_owned()]])
            .unwrap();
        assert_eq!(import_feed(&mut store, &source()).unwrap(), 3);

        let table = store.read("Offers Feed").unwrap();
        assert_eq!(table.data().len(), 3);
        assert_eq!(table.cell(3, 1), "2001");
        assert_eq!(table.cell(3, 2), "EUR");
    }

    #[test]
    fn account_id_is_required() {
        let mut store = store("");
        base_config::set_config_value(&mut store, ConfigGroup::MerchantCenter, ConfigField::AccountId, "").unwrap();
        let error = import_feed(&mut store, &source()).unwrap_err();
        assert!(matches!(error, PvaError::FeedError(FeedError::MissingAccount)));
    }
}
