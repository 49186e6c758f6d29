//! Product catalogue lookups and order / quote placement.
//!
//! Orders are described with human readable keynames (package, items, preset,
//! location); [`OrderingManager::generate_order`] turns them into the numeric
//! ids `SoftLayer_Product_Order` expects.

use crate::core::Client;
use crate::utils::error::{Result, SoftLayerError};
use crate::utils::filter::{lookup, lookup_i64, lookup_str, query_filter_in, value_as_i64, NestedFilter};
use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::OnceLock;

const PACKAGE_MASK: &str = "id, name, keyName, description, isActive, type[keyName]";
const CATEGORY_MASK: &str = "id, isRequired, itemCategory[id, name, categoryCode]";
const ITEM_MASK: &str = "id, keyName, description, itemCategory, categories, prices";
const PRESET_MASK: &str = "id, name, keyName, description";
const PRICE_LIST_MASK: &str = "id, description, capacity, itemCategory, keyName, \
    prices[categories], softwareDescription[id,referenceCode,longDescription]";
const QUOTE_MASK: &str = "order[id,items[id,package[id,keyName]]]";

/// 依序編號的類別：第一個 GPU 用 gpu0，第二個用 gpu1
const NUMBERED_CATEGORIES: [&str; 2] = ["gpu0", "pcie_slot0"];

fn datacenter_regex() -> &'static Regex {
    static DATACENTER: OnceLock<Regex> = OnceLock::new();
    DATACENTER.get_or_init(|| Regex::new(r"^[a-zA-Z]{3}[0-9]{2}").expect("static datacenter regex"))
}

/// Everything needed to build one `SoftLayer_Container_Product_Order`.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub package_keyname: String,
    /// 資料中心名稱（`dal13`）、區域 keyname（`DALLAS13`）、數字 id 或 `NONE`
    pub location: String,
    pub item_keynames: Vec<String>,
    pub complex_type: Option<String>,
    pub hourly: bool,
    pub preset_keyname: Option<String>,
    /// 額外欄位直接併入訂單（hostname 等）
    pub extras: Map<String, Value>,
    pub quantity: u32,
}

impl OrderRequest {
    pub fn new(package_keyname: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            package_keyname: package_keyname.into(),
            location: location.into(),
            item_keynames: Vec::new(),
            complex_type: None,
            hourly: true,
            preset_keyname: None,
            extras: Map::new(),
            quantity: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderingManager {
    client: Client,
}

impl OrderingManager {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn get_packages_of_type(&self, package_types: &[&str], mask: Option<&str>) -> Result<Vec<Value>> {
        let mut filter = NestedFilter::new();
        filter.set(&["type", "keyName"], query_filter_in(package_types.iter().copied()));

        let packages = self
            .client
            .call("Product_Package", "getAllObjects")
            .mask(mask.unwrap_or(PACKAGE_MASK))
            .filter(filter.into_value())
            .send()
            .await?;
        Ok(Self::filter_outlet_packages(super::as_list(packages)))
    }

    /// OUTLET 套件需另行處理，這裡一律排除
    pub fn filter_outlet_packages(packages: Vec<Value>) -> Vec<Value> {
        packages
            .into_iter()
            .filter(|package| {
                ["description", "name"].iter().all(|field| {
                    !lookup_str(package, &[*field])
                        .unwrap_or_default()
                        .to_uppercase()
                        .contains("OUTLET")
                })
            })
            .collect()
    }

    pub fn get_only_active_packages(packages: Vec<Value>) -> Vec<Value> {
        packages.into_iter().filter(is_active).collect()
    }

    /// 同類型有多個套件時取最後一個
    pub async fn get_package_by_type(&self, package_type: &str, mask: Option<&str>) -> Result<Option<Value>> {
        let mut packages = self.get_packages_of_type(&[package_type], mask).await?;
        Ok(packages.pop())
    }

    pub async fn get_package_id_by_type(&self, package_type: &str) -> Result<i64> {
        let package = self
            .get_package_by_type(package_type, Some("mask[id, name, description, isActive, type[keyName]]"))
            .await?;
        package
            .as_ref()
            .and_then(|p| lookup_i64(p, &["id"]))
            .ok_or_else(|| SoftLayerError::not_found(format!("No package found for type: {}", package_type)))
    }

    pub async fn get_package_by_key(&self, package_keyname: &str, mask: Option<&str>) -> Result<Value> {
        let mut filter = NestedFilter::new();
        filter.set(&["keyName"], json!({ "operation": package_keyname }));

        let packages = self
            .client
            .call("Product_Package", "getAllObjects")
            .mask(mask.unwrap_or(PACKAGE_MASK))
            .filter(filter.into_value())
            .send()
            .await?;

        super::as_list(packages)
            .into_iter()
            .find(|package| keyname_matches(package, "keyName", package_keyname))
            .ok_or_else(|| SoftLayerError::not_found(format!("Package {} does not exist", package_keyname)))
    }

    async fn package_id(&self, package_keyname: &str) -> Result<i64> {
        let package = self.get_package_by_key(package_keyname, Some("id, keyName")).await?;
        lookup_i64(&package, &["id"])
            .ok_or_else(|| SoftLayerError::not_found(format!("Package {} does not exist", package_keyname)))
    }

    /// 排除 BLUEMIX_SERVICE 類型並只保留可下單的套件
    pub async fn list_packages(&self, filter: Option<Value>, mask: Option<&str>) -> Result<Vec<Value>> {
        let mut filter = NestedFilter::from_value(filter);
        filter.set(&["type", "keyName"], json!({ "operation": "!= BLUEMIX_SERVICE" }));

        let packages = self
            .client
            .call("Product_Package", "getAllObjects")
            .mask(mask.unwrap_or(PACKAGE_MASK))
            .filter(filter.into_value())
            .send()
            .await?;
        Ok(Self::get_only_active_packages(super::as_list(packages)))
    }

    pub async fn list_categories(&self, package_keyname: &str, mask: Option<&str>) -> Result<Vec<Value>> {
        let package_id = self.package_id(package_keyname).await?;
        let categories = self
            .client
            .call("Product_Package", "getConfiguration")
            .id(package_id)
            .mask(mask.unwrap_or(CATEGORY_MASK))
            .send()
            .await?;
        Ok(super::as_list(categories))
    }

    pub async fn list_items(
        &self,
        package_keyname: &str,
        mask: Option<&str>,
        filter: Option<Value>,
    ) -> Result<Vec<Value>> {
        let package_id = self.package_id(package_keyname).await?;
        let mut call = self
            .client
            .call("Product_Package", "getItems")
            .id(package_id)
            .mask(mask.unwrap_or(ITEM_MASK));
        if let Some(filter) = filter {
            call = call.filter(filter);
        }
        Ok(super::as_list(call.send().await?))
    }

    /// 一般 preset 加上帳號限定的 preset
    pub async fn list_presets(
        &self,
        package_keyname: &str,
        mask: Option<&str>,
        filter: Option<Value>,
    ) -> Result<Vec<Value>> {
        let package_id = self.package_id(package_keyname).await?;
        let mask = mask.unwrap_or(PRESET_MASK);

        let mut presets = Vec::new();
        for method in ["getActivePresets", "getAccountRestrictedActivePresets"] {
            let mut call = self
                .client
                .call("Product_Package", method)
                .id(package_id)
                .mask(mask);
            if let Some(filter) = &filter {
                call = call.filter(filter.clone());
            }
            presets.extend(super::as_list(call.send().await?));
        }
        Ok(presets)
    }

    pub async fn get_preset_by_key(
        &self,
        package_keyname: &str,
        preset_keyname: &str,
        mask: Option<&str>,
    ) -> Result<Value> {
        let operation = json!({ "operation": format!("_= {}", preset_keyname) });
        let mut filter = NestedFilter::new();
        filter.set(&["activePresets", "keyName"], operation.clone());
        filter.set(&["accountRestrictedActivePresets", "keyName"], operation);

        self.list_presets(package_keyname, mask, Some(filter.into_value()))
            .await?
            .into_iter()
            .find(|preset| keyname_matches(preset, "keyName", preset_keyname))
            .ok_or_else(|| {
                SoftLayerError::not_found(format!(
                    "Preset {} does not exist in package {}",
                    preset_keyname, package_keyname
                ))
            })
    }

    pub async fn get_preset_prices(&self, preset_id: i64) -> Result<Value> {
        self.client
            .call("Product_Package_Preset", "getObject")
            .id(preset_id)
            .mask("mask[prices[item]]")
            .send()
            .await
    }

    /// 處理器 / 核心數類項目的 capacity，用來套用價格的容量限制
    /// 多個 keyname 都帶容量時，以最後一個為準
    pub fn get_item_capacity(items: &[Value], item_keynames: &[String]) -> Option<String> {
        let mut capacity = None;
        for keyname in item_keynames {
            let Some(item) = items
                .iter()
                .find(|item| lookup_str(item, &["keyName"]) == Some(keyname.as_str()))
            else {
                continue;
            };
            if ["CORE_THREAD", "TIER", "INTEL_XEON"]
                .iter()
                .any(|marker| keyname.contains(marker))
            {
                capacity = lookup(item, &["capacity"]).map(value_to_string);
            }
        }
        capacity
    }

    /// 選出沒有地區群組、期數相符、且符合容量限制的價格
    pub fn get_item_price_id(core: Option<&str>, prices: &[Value], term: i64) -> Option<i64> {
        let core: Option<i64> = core.and_then(|c| c.trim().parse().ok());
        let mut price_id = None;

        for price in prices {
            if !is_falsy(price.get("locationGroupId")) {
                continue;
            }
            let term_matches = match price.get("termLength") {
                None => term == 0,
                Some(Value::Null) => true,
                Some(Value::String(s)) if s.is_empty() => true,
                Some(value) => value_as_i64(value) == Some(term),
            };
            if !term_matches {
                continue;
            }

            let restriction = lookup_str(price, &["capacityRestrictionType"]).unwrap_or_default();
            match core {
                Some(core) if !restriction.is_empty() => {
                    let minimum = lookup_i64(price, &["capacityRestrictionMinimum"]).unwrap_or(-1);
                    let maximum = lookup_i64(price, &["capacityRestrictionMaximum"]).unwrap_or(-1);
                    let within = minimum <= core && core <= maximum;
                    if restriction.contains("PROCESSOR")
                        || ((restriction.contains("STORAGE") || restriction.contains("CORE")) && within)
                    {
                        price_id = lookup_i64(price, &["id"]);
                    }
                }
                _ => price_id = lookup_i64(price, &["id"]),
            }
        }
        price_id
    }

    /// 將 item keyname（或軟體 referenceCode）轉成 price id
    pub async fn get_price_id_list(
        &self,
        package_keyname: &str,
        item_keynames: &[String],
        core: Option<&str>,
    ) -> Result<Vec<i64>> {
        let items = self
            .list_items(package_keyname, Some(PRICE_LIST_MASK), None)
            .await?;
        let capacity = Self::get_item_capacity(&items, item_keynames);
        let core = core.map(str::to_string).or(capacity);

        let mut counters: Vec<(&str, i64)> = NUMBERED_CATEGORIES.iter().map(|c| (*c, -1)).collect();
        let mut price_ids = Vec::with_capacity(item_keynames.len());

        for keyname in item_keynames {
            let item = items
                .iter()
                .find(|item| {
                    lookup_str(item, &["keyName"]) == Some(keyname.as_str())
                        || lookup_str(item, &["softwareDescription", "referenceCode"]) == Some(keyname.as_str())
                })
                .ok_or_else(|| {
                    SoftLayerError::not_found(format!(
                        "Item {} does not exist for package {}",
                        keyname, package_keyname
                    ))
                })?;
            let prices: &[Value] = item
                .get("prices")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let category = lookup_str(item, &["itemCategory", "categoryCode"]).unwrap_or_default();

            let price_id = match counters.iter_mut().find(|(code, _)| *code == category) {
                Some((code, count)) => {
                    *count += 1;
                    let numbered = format!("{}{}", code.trim_end_matches('0'), count);
                    prices
                        .iter()
                        .find(|price| {
                            is_falsy(price.get("locationGroupId"))
                                && price
                                    .get("categories")
                                    .and_then(Value::as_array)
                                    .and_then(|c| c.first())
                                    .and_then(|c| lookup_str(c, &["categoryCode"]))
                                    == Some(numbered.as_str())
                        })
                        .and_then(|price| lookup_i64(price, &["id"]))
                }
                None => Self::get_item_price_id(core.as_deref(), prices, 0),
            };

            let price_id = price_id.ok_or_else(|| {
                SoftLayerError::not_found(format!("Could not find valid price for item {}", keyname))
            })?;
            price_ids.push(price_id);
        }

        Ok(price_ids)
    }

    /// `NONE` 為 0；`abc01` 形式視為資料中心名稱，其餘視為區域 keyname
    pub async fn get_location_id(&self, location: &str) -> Result<i64> {
        if let Ok(id) = location.trim().parse::<i64>() {
            return Ok(id);
        }
        if location.eq_ignore_ascii_case("NONE") {
            return Ok(0);
        }

        let mut filter = NestedFilter::new();
        if datacenter_regex().is_match(location) {
            filter.set(&["name"], json!({ "operation": location }));
        } else {
            filter.set(&["regions", "keyname"], json!({ "operation": location }));
        }

        let datacenters = super::as_list(
            self.client
                .call("Location", "getDatacenters")
                .mask("mask[id,name,regions[keyname]]")
                .filter(filter.into_value())
                .send()
                .await?,
        );
        match datacenters.as_slice() {
            [datacenter] => lookup_i64(datacenter, &["id"])
                .ok_or_else(|| SoftLayerError::not_found(format!("Unable to find location: {}", location))),
            _ => Err(SoftLayerError::not_found(format!("Unable to find location: {}", location))),
        }
    }

    pub async fn package_locations(&self, package_keyname: &str) -> Result<Vec<Value>> {
        let package_id = self.package_id(package_keyname).await?;
        let regions = self
            .client
            .call("Product_Package", "getRegions")
            .id(package_id)
            .mask("mask[description, keyname, location]")
            .send()
            .await?;
        Ok(super::as_list(regions))
    }

    pub async fn generate_order(&self, request: &OrderRequest) -> Result<Value> {
        let complex_type = request
            .complex_type
            .as_deref()
            .ok_or_else(|| SoftLayerError::argument("A complex type must be specified with the order"))?;
        let package_id = self.package_id(&request.package_keyname).await?;

        let mut order = request.extras.clone();
        order.insert("packageId".to_string(), json!(package_id));
        order.insert("quantity".to_string(), json!(request.quantity));
        order.insert(
            "location".to_string(),
            json!(self.get_location_id(&request.location).await?),
        );
        order.insert("useHourlyPricing".to_string(), json!(request.hourly));

        let mut preset_core = None;
        if let Some(preset_keyname) = &request.preset_keyname {
            let preset = self
                .get_preset_by_key(&request.package_keyname, preset_keyname, None)
                .await?;
            let preset_id = lookup_i64(&preset, &["id"]).ok_or_else(|| {
                SoftLayerError::not_found(format!("Preset {} has no id", preset_keyname))
            })?;
            let preset_prices = self.get_preset_prices(preset_id).await?;
            preset_core = preset_prices
                .get("prices")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter(|price| {
                    lookup_str(price, &["item", "itemCategory", "categoryCode"]) == Some("guest_core")
                })
                .filter_map(|price| lookup(price, &["item", "capacity"]).map(value_to_string))
                .last();
            order.insert("presetId".to_string(), json!(preset_id));
        }

        order.insert("complexType".to_string(), json!(complex_type));
        let price_ids = self
            .get_price_id_list(&request.package_keyname, &request.item_keynames, preset_core.as_deref())
            .await?;
        order.insert(
            "prices".to_string(),
            Value::Array(price_ids.into_iter().map(|id| json!({ "id": id })).collect()),
        );

        Ok(json!({ "orderContainers": [Value::Object(order)] }))
    }

    pub async fn verify_order(&self, request: &OrderRequest) -> Result<Value> {
        let order = self.generate_order(request).await?;
        self.client
            .call("Product_Order", "verifyOrder")
            .arg(order)
            .send()
            .await
    }

    pub async fn place_order(&self, request: &OrderRequest) -> Result<Value> {
        let order = self.generate_order(request).await?;
        tracing::info!(package = %request.package_keyname, "placing order");
        self.client
            .call("Product_Order", "placeOrder")
            .arg(order)
            .send()
            .await
    }

    pub async fn place_quote(&self, request: &OrderRequest, quote_name: &str, send_email: bool) -> Result<Value> {
        let mut order = self.generate_order(request).await?;
        if let Some(container) = order
            .get_mut("orderContainers")
            .and_then(Value::as_array_mut)
            .and_then(|containers| containers.first_mut())
            .and_then(Value::as_object_mut)
        {
            container.insert("quoteName".to_string(), json!(quote_name));
            container.insert("sendQuoteEmailFlag".to_string(), json!(send_email));
        }
        self.client
            .call("Product_Order", "placeQuote")
            .arg(order)
            .send()
            .await
    }

    pub async fn get_quotes(&self) -> Result<Vec<Value>> {
        self.client
            .call("Account", "getActiveQuotes")
            .mask(QUOTE_MASK)
            .send_all()
            .await
    }

    pub async fn get_quote_details(&self, quote_id: i64) -> Result<Value> {
        self.client
            .call("Billing_Order_Quote", "getObject")
            .id(quote_id)
            .send()
            .await
    }

    pub async fn get_order_container(&self, quote_id: i64) -> Result<Value> {
        self.client
            .call("Billing_Order_Quote", "getRecalculatedOrderContainer")
            .id(quote_id)
            .send()
            .await
    }

    /// 以報價單的訂單容器為底，覆寫數量與額外欄位
    pub async fn generate_order_template(
        &self,
        quote_id: i64,
        extra: &Map<String, Value>,
        quantity: u32,
    ) -> Result<Value> {
        let container = self.get_order_container(quote_id).await?;
        let Value::Object(mut container) = container else {
            return Err(SoftLayerError::api(
                "SoftLayer_Exception",
                format!("Quote {} has no order container", quote_id),
            ));
        };
        container.insert("quantity".to_string(), json!(quantity));
        for (key, value) in extra {
            container.insert(key.clone(), value.clone());
        }
        Ok(Value::Object(container))
    }

    pub async fn verify_quote(&self, quote_id: i64, extra: &Map<String, Value>, quantity: u32) -> Result<Value> {
        let container = clean_quote_container(self.generate_order_template(quote_id, extra, quantity).await?);
        self.client
            .call("Billing_Order_Quote", "verifyOrder")
            .id(quote_id)
            .arg(container)
            .send()
            .await
    }

    pub async fn order_quote(&self, quote_id: i64, extra: &Map<String, Value>, quantity: u32) -> Result<Value> {
        let container = clean_quote_container(self.generate_order_template(quote_id, extra, quantity).await?);
        tracing::info!(quote_id, "ordering quote");
        self.client
            .call("Billing_Order_Quote", "placeOrder")
            .id(quote_id)
            .arg(container)
            .send()
            .await
    }
}

/// 重新計算的容器帶有空字串欄位，送出前移除
fn clean_quote_container(container: Value) -> Value {
    match container {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, value)| !matches!(value, Value::Null) && value.as_str() != Some(""))
                .collect(),
        ),
        other => other,
    }
}

fn is_active(package: &Value) -> bool {
    !is_falsy(package.get("isActive"))
}

/// null、空字串、0、false 與缺少欄位都視為「沒有」
pub(crate) fn is_falsy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::String(s)) => s.is_empty() || s == "0",
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(_) => false,
    }
}

/// 沒有回傳該欄位時（mask 未包含）信任伺服器端的過濾
fn keyname_matches(value: &Value, field: &str, keyname: &str) -> bool {
    lookup_str(value, &[field]).map_or(true, |k| k == keyname)
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::testing::fixture_client;

    fn keynames(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn test_packages_of_type_drops_outlet() {
        let (client, transport) = fixture_client();
        let manager = OrderingManager::new(client);
        let packages = manager
            .get_packages_of_type(&["BARE_METAL_CPU"], None)
            .await
            .unwrap();
        let ids: Vec<i64> = packages.iter().filter_map(|p| lookup_i64(p, &["id"])).collect();
        assert_eq!(ids, vec![202, 200]);

        let filter = transport
            .last_call("Product_Package", "getAllObjects")
            .unwrap()
            .filter
            .unwrap();
        assert_eq!(
            filter,
            json!({"type": {"keyName": {"operation": "in", "options": [{"name": "data", "value": ["BARE_METAL_CPU"]}]}}})
        );
    }

    #[tokio::test]
    async fn test_package_id_by_type() {
        let (client, transport) = fixture_client();
        let manager = OrderingManager::new(client);
        assert_eq!(manager.get_package_id_by_type("BARE_METAL_CPU").await.unwrap(), 200);

        transport.set_response("Product_Package", "getAllObjects", json!([]));
        let err = manager.get_package_id_by_type("NOPE").await.unwrap_err();
        assert_eq!(err.to_string(), "No package found for type: NOPE");
    }

    #[test]
    fn test_only_active_packages() {
        let packages = vec![
            json!({"id": 1, "isActive": 1}),
            json!({"id": 2, "isActive": 0}),
            json!({"id": 3, "isActive": "1"}),
            json!({"id": 4}),
        ];
        let active = OrderingManager::get_only_active_packages(packages);
        assert_eq!(active.len(), 2);
        assert_eq!(active[1]["id"], 3);
    }

    #[tokio::test]
    async fn test_get_package_by_key() {
        let (client, transport) = fixture_client();
        let manager = OrderingManager::new(client);
        let package = manager.get_package_by_key("BARE_METAL_SERVER", None).await.unwrap();
        assert_eq!(package["id"], 200);
        assert_eq!(
            transport.last_call("Product_Package", "getAllObjects").unwrap().filter,
            Some(json!({"keyName": {"operation": "BARE_METAL_SERVER"}}))
        );

        let err = manager.get_package_by_key("MISSING", None).await.unwrap_err();
        assert_eq!(err.to_string(), "Package MISSING does not exist");
    }

    #[tokio::test]
    async fn test_list_presets_combines_both_lists() {
        let (client, transport) = fixture_client();
        transport.set_response(
            "Product_Package",
            "getAccountRestrictedActivePresets",
            json!([{"id": 500, "keyName": "ACCOUNT_ONLY"}]),
        );
        let presets = OrderingManager::new(client)
            .list_presets("BARE_METAL_SERVER", None, None)
            .await
            .unwrap();
        assert_eq!(presets.len(), 3);
        assert_eq!(presets[2]["keyName"], "ACCOUNT_ONLY");
    }

    #[tokio::test]
    async fn test_get_preset_by_key() {
        let (client, transport) = fixture_client();
        let manager = OrderingManager::new(client);
        let preset = manager
            .get_preset_by_key("BARE_METAL_SERVER", "M1_56X448X100", None)
            .await
            .unwrap();
        assert_eq!(preset["id"], 406);
        let filter = transport
            .last_call("Product_Package", "getActivePresets")
            .unwrap()
            .filter
            .unwrap();
        assert_eq!(filter["activePresets"]["keyName"]["operation"], "_= M1_56X448X100");

        let err = manager
            .get_preset_by_key("BARE_METAL_SERVER", "NOPE", None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Preset NOPE does not exist in package BARE_METAL_SERVER");
    }

    #[test]
    fn test_item_price_id_skips_location_groups() {
        let prices = vec![
            json!({"id": 1, "locationGroupId": 503}),
            json!({"id": 2, "locationGroupId": ""}),
        ];
        assert_eq!(OrderingManager::get_item_price_id(None, &prices, 0), Some(2));
    }

    #[test]
    fn test_item_price_id_capacity_restriction() {
        let prices = vec![
            json!({"id": 10, "locationGroupId": null, "capacityRestrictionType": "CORE",
                   "capacityRestrictionMinimum": "1", "capacityRestrictionMaximum": "4"}),
            json!({"id": 11, "locationGroupId": null, "capacityRestrictionType": "CORE",
                   "capacityRestrictionMinimum": "5", "capacityRestrictionMaximum": "16"}),
        ];
        assert_eq!(OrderingManager::get_item_price_id(Some("8"), &prices, 0), Some(11));
        assert_eq!(OrderingManager::get_item_price_id(Some("2"), &prices, 0), Some(10));
        assert_eq!(OrderingManager::get_item_price_id(Some("32"), &prices, 0), None);
    }

    #[test]
    fn test_item_price_id_term_length() {
        let prices = vec![
            json!({"id": 20, "locationGroupId": "", "termLength": 12}),
            json!({"id": 21, "locationGroupId": "", "termLength": 36}),
        ];
        assert_eq!(OrderingManager::get_item_price_id(None, &prices, 36), Some(21));
        assert_eq!(OrderingManager::get_item_price_id(None, &prices, 0), None);
    }

    #[test]
    fn test_item_price_id_null_term_matches_any_term() {
        let prices = vec![json!({"id": 30, "locationGroupId": "", "termLength": null})];
        assert_eq!(OrderingManager::get_item_price_id(None, &prices, 0), Some(30));
        assert_eq!(OrderingManager::get_item_price_id(None, &prices, 12), Some(30));

        let prices = vec![json!({"id": 31, "locationGroupId": ""})];
        assert_eq!(OrderingManager::get_item_price_id(None, &prices, 0), Some(31));
        assert_eq!(OrderingManager::get_item_price_id(None, &prices, 12), None);
    }

    #[test]
    fn test_item_capacity() {
        let items = vec![
            json!({"keyName": "INTEL_XEON_4110_2_10", "capacity": "16"}),
            json!({"keyName": "RAM_16_GB", "capacity": "16"}),
        ];
        assert_eq!(
            OrderingManager::get_item_capacity(&items, &keynames(&["RAM_16_GB", "INTEL_XEON_4110_2_10"])),
            Some("16".to_string())
        );
        assert_eq!(OrderingManager::get_item_capacity(&items, &keynames(&["RAM_16_GB"])), None);
    }

    #[test]
    fn test_item_capacity_last_match_wins() {
        let items = vec![
            json!({"keyName": "GUEST_CORE_4_CORE_THREAD", "capacity": "4"}),
            json!({"keyName": "STORAGE_TIER_2", "capacity": "2"}),
        ];
        assert_eq!(
            OrderingManager::get_item_capacity(
                &items,
                &keynames(&["GUEST_CORE_4_CORE_THREAD", "STORAGE_TIER_2"])
            ),
            Some("2".to_string())
        );
        assert_eq!(
            OrderingManager::get_item_capacity(
                &items,
                &keynames(&["STORAGE_TIER_2", "GUEST_CORE_4_CORE_THREAD"])
            ),
            Some("4".to_string())
        );
    }

    #[tokio::test]
    async fn test_price_id_list() {
        let (client, _) = fixture_client();
        let ids = OrderingManager::new(client)
            .get_price_id_list(
                "BARE_METAL_SERVER",
                &keynames(&[
                    "GUEST_CORE_4",
                    "RAM_16_GB",
                    "UBUNTU_20_64",
                    "GPU_NVIDIA_TESLA_P100",
                    "GPU_NVIDIA_TESLA_P100",
                    "INTEL_XEON_4110_2_10",
                ]),
                None,
            )
            .await
            .unwrap();
        assert_eq!(ids, vec![1642, 1644, 37650, 5000, 5001, 201161]);
    }

    #[tokio::test]
    async fn test_price_id_list_unknown_item() {
        let (client, _) = fixture_client();
        let err = OrderingManager::new(client)
            .get_price_id_list("BARE_METAL_SERVER", &keynames(&["NOT_AN_ITEM"]), None)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Item NOT_AN_ITEM does not exist for package BARE_METAL_SERVER"
        );
    }

    #[tokio::test]
    async fn test_location_id() {
        let (client, transport) = fixture_client();
        let manager = OrderingManager::new(client);

        assert_eq!(manager.get_location_id("NONE").await.unwrap(), 0);
        assert_eq!(manager.get_location_id("1234").await.unwrap(), 1234);
        assert!(transport.calls().is_empty());

        assert_eq!(manager.get_location_id("dal13").await.unwrap(), 1854895);
        assert_eq!(
            transport.last_call("Location", "getDatacenters").unwrap().filter,
            Some(json!({"name": {"operation": "dal13"}}))
        );

        manager.get_location_id("DALLAS13").await.unwrap();
        assert_eq!(
            transport.last_call("Location", "getDatacenters").unwrap().filter,
            Some(json!({"regions": {"keyname": {"operation": "DALLAS13"}}}))
        );

        transport.set_response("Location", "getDatacenters", json!([]));
        let err = manager.get_location_id("mars01").await.unwrap_err();
        assert_eq!(err.to_string(), "Unable to find location: mars01");
    }

    #[tokio::test]
    async fn test_generate_order_with_preset() {
        let (client, transport) = fixture_client();
        let mut request = OrderRequest::new("BARE_METAL_SERVER", "DALLAS13");
        request.item_keynames = keynames(&["UBUNTU_20_64", "100_MBPS_PUBLIC_PRIVATE_NETWORK_UPLINKS"]);
        request.complex_type = Some("SoftLayer_Container_Product_Order_Virtual_Guest".to_string());
        request.preset_keyname = Some("M1_64X512X25".to_string());
        request.extras.insert("hardware".to_string(), json!([{"hostname": "test"}]));

        let order = OrderingManager::new(client).generate_order(&request).await.unwrap();
        let container = &order["orderContainers"][0];
        assert_eq!(container["packageId"], 200);
        assert_eq!(container["location"], 1854895);
        assert_eq!(container["presetId"], 405);
        assert_eq!(container["useHourlyPricing"], true);
        assert_eq!(container["quantity"], 1);
        assert_eq!(container["hardware"][0]["hostname"], "test");
        assert_eq!(container["prices"], json!([{"id": 37650}, {"id": 272}]));

        let preset_call = transport
            .last_call("Product_Package_Preset", "getObject")
            .unwrap();
        assert_eq!(preset_call.identifier, Some(405));
    }

    #[tokio::test]
    async fn test_generate_order_requires_complex_type() {
        let (client, transport) = fixture_client();
        let request = OrderRequest::new("BARE_METAL_SERVER", "dal13");
        let err = OrderingManager::new(client).generate_order(&request).await.unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_place_quote_sets_name() {
        let (client, transport) = fixture_client();
        let mut request = OrderRequest::new("BARE_METAL_SERVER", "NONE");
        request.item_keynames = keynames(&["RAM_16_GB"]);
        request.complex_type = Some("SoftLayer_Container_Product_Order_Virtual_Guest".to_string());

        let result = OrderingManager::new(client)
            .place_quote(&request, "wombat", true)
            .await
            .unwrap();
        assert_eq!(result["quote"]["name"], "wombat");

        let call = transport.last_call("Product_Order", "placeQuote").unwrap();
        let container = &call.args[0]["orderContainers"][0];
        assert_eq!(container["quoteName"], "wombat");
        assert_eq!(container["sendQuoteEmailFlag"], true);
        assert_eq!(container["location"], 0);
    }

    #[tokio::test]
    async fn test_verify_quote_cleans_container() {
        let (client, transport) = fixture_client();
        let mut extra = Map::new();
        extra.insert("hardware".to_string(), json!([{"hostname": "quote"}]));
        OrderingManager::new(client)
            .verify_quote(1234, &extra, 2)
            .await
            .unwrap();

        let call = transport.last_call("Billing_Order_Quote", "verifyOrder").unwrap();
        assert_eq!(call.identifier, Some(1234));
        let container = call.args[0].as_object().unwrap();
        assert_eq!(container["quantity"], 2);
        assert_eq!(container["hardware"][0]["hostname"], "quote");
        assert!(!container.contains_key("presetId"));
        assert!(!container.contains_key("useHourlyPricing"));
    }
}
