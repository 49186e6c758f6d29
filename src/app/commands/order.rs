use crate::app::environment::Environment;
use crate::app::formatting::{blank, Cell, Table};
use crate::app::helpers::{clean_time, parse_json_object};
use crate::managers::ordering::OrderRequest;
use crate::managers::OrderingManager;
use crate::utils::error::{Result, SoftLayerError};
use crate::utils::filter::{lookup, lookup_str, query_filter, NestedFilter};
use clap::{Args, Subcommand, ValueEnum};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Billing {
    Hourly,
    Monthly,
}

#[derive(Debug, Clone, Args)]
pub struct OrderArgs {
    /// Package keyName, see `slcli order package-list`
    pub package_keyname: String,
    /// Datacenter or region keyname, see `slcli order package-locations`
    pub location: String,
    /// Item keyNames, see `slcli order item-list`
    #[arg(required = true)]
    pub order_items: Vec<String>,
    /// Preset keyName, see `slcli order preset-list`
    #[arg(long)]
    pub preset: Option<String>,
    /// Billing rate
    #[arg(long, value_enum, default_value_t = Billing::Hourly)]
    pub billing: Billing,
    /// Complex type of the order, e.g. SoftLayer_Container_Product_Order_Virtual_Guest
    #[arg(long)]
    pub complex_type: Option<String>,
    /// JSON string of extra data to add to the order
    #[arg(long)]
    pub extras: Option<String>,
    /// Number of items to order
    #[arg(long, default_value_t = 1)]
    pub quantity: u32,
}

impl OrderArgs {
    fn to_request(&self) -> Result<OrderRequest> {
        let mut request = OrderRequest::new(&self.package_keyname, &self.location);
        request.item_keynames = self
            .order_items
            .iter()
            .flat_map(|items| items.split(','))
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect();
        request.preset_keyname = self.preset.clone();
        request.hourly = self.billing == Billing::Hourly;
        request.complex_type = self.complex_type.clone();
        request.extras = parse_json_object(self.extras.as_deref(), "--extras")?;
        request.quantity = self.quantity;
        Ok(request)
    }
}

#[derive(Debug, Subcommand)]
pub enum OrderCommand {
    /// List packages that can be ordered
    PackageList {
        /// A word (or string) used to filter package names
        #[arg(long)]
        keyword: Option<String>,
        /// The keyname for the type of package, e.g. BARE_METAL_CPU
        #[arg(long)]
        package_type: Option<String>,
    },
    /// List the categories of a package
    CategoryList {
        package_keyname: String,
        /// Show only required categories
        #[arg(long)]
        required: bool,
    },
    /// List package items used for ordering
    ItemList {
        package_keyname: String,
        /// A word (or string) used to filter item names
        #[arg(long)]
        keyword: Option<String>,
        /// Category code to filter items by
        #[arg(long)]
        category: Option<String>,
    },
    /// List package presets
    PresetList {
        package_keyname: String,
        /// A word (or string) used to filter preset names
        #[arg(long)]
        keyword: Option<String>,
    },
    /// List datacenters a package can be ordered in
    PackageLocations { package_keyname: String },
    /// Place or verify an order
    Place {
        #[command(flatten)]
        order: OrderArgs,
        /// Verify the order without placing it
        #[arg(long)]
        verify: bool,
    },
    /// Save an order as a quote
    Quote {
        #[command(flatten)]
        order: OrderArgs,
        /// Name for the quote
        #[arg(long)]
        name: String,
        /// Send the quote to the account's email
        #[arg(long)]
        send_email: bool,
    },
    /// List active quotes on the account
    QuoteList,
    /// View a quote
    QuoteDetail { quote: i64 },
    /// Place or verify an order from a quote
    PlaceQuote {
        quote: i64,
        /// Verify the quote without placing it
        #[arg(long)]
        verify: bool,
        /// Number of items to order
        #[arg(long, default_value_t = 1)]
        quantity: u32,
        /// JSON string of extra data to add to the order
        #[arg(long)]
        extras: Option<String>,
    },
}

/// 驗證結果的價格明細
fn verified_table(result: &Value, hourly: bool) -> Table {
    let fee = if hourly { "hourlyRecurringFee" } else { "recurringFee" };
    let mut table = Table::new(["keyName", "description", "cost"]);
    for price in result.get("prices").and_then(Value::as_array).into_iter().flatten() {
        let cost = match lookup(price, &[fee]) {
            Some(Value::String(raw)) => match raw.parse::<f64>() {
                Ok(amount) => Cell::from(format!("{:.2}", amount)),
                Err(_) => Cell::from(raw.as_str()),
            },
            other => Cell::from(other),
        };
        table.add_row(vec![
            lookup(price, &["item", "keyName"]).into(),
            lookup(price, &["item", "description"]).into(),
            cost,
        ]);
    }
    table
}

fn placed_table(result: &Value) -> Table {
    let mut table = Table::key_value();
    table.add_row(vec!["id".into(), result.get("orderId").into()]);
    table.add_row(vec!["created".into(), result.get("orderDate").into()]);
    table.add_row(vec![
        "status".into(),
        lookup(result, &["placedOrder", "status"]).into(),
    ]);
    table
}

fn confirm_charges(env: &mut Environment) -> Result<()> {
    if env.skip_confirmations
        || env.confirm("This action will incur charges on your account. Continue?", false)?
    {
        Ok(())
    } else {
        Err(SoftLayerError::abort("Aborting order."))
    }
}

fn first_price_id(item: &Value) -> Cell {
    item.get("prices")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .find(|price| match price.get("locationGroupId") {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        })
        .and_then(|price| price.get("id"))
        .into()
}

pub async fn run(env: &mut Environment, cmd: OrderCommand) -> Result<()> {
    let manager = OrderingManager::new(env.client.clone());
    match cmd {
        OrderCommand::PackageList {
            keyword,
            package_type,
        } => {
            let filter = keyword.map(|keyword| {
                let mut filter = NestedFilter::new();
                filter.set(&["name"], query_filter(format!("*= {}", keyword)));
                filter.into_value()
            });
            let packages = manager.list_packages(filter, None).await?;

            let mut table = Table::new(["id", "name", "keyName", "type"]);
            for package in packages.iter().filter(|package| {
                package_type
                    .as_deref()
                    .map_or(true, |wanted| lookup_str(package, &["type", "keyName"]) == Some(wanted))
            }) {
                table.add_row(vec![
                    package.get("id").into(),
                    package.get("name").into(),
                    package.get("keyName").into(),
                    lookup(package, &["type", "keyName"]).into(),
                ]);
            }
            env.fout(table)
        }
        OrderCommand::CategoryList {
            package_keyname,
            required,
        } => {
            let categories = manager.list_categories(&package_keyname, None).await?;
            let mut table = Table::new(["name", "categoryCode", "isRequired"]);
            for category in &categories {
                let is_required = match category.get("isRequired") {
                    Some(Value::Bool(b)) => *b,
                    Some(Value::Number(n)) => n.as_i64() == Some(1),
                    _ => false,
                };
                if required && !is_required {
                    continue;
                }
                table.add_row(vec![
                    lookup(category, &["itemCategory", "name"]).into(),
                    lookup(category, &["itemCategory", "categoryCode"]).into(),
                    (if is_required { "Y" } else { "N" }).into(),
                ]);
            }
            env.fout(table)
        }
        OrderCommand::ItemList {
            package_keyname,
            keyword,
            category,
        } => {
            let mut filter = NestedFilter::new();
            if let Some(keyword) = &keyword {
                filter.set(
                    &["items", "description"],
                    query_filter(format!("*= {}", keyword)),
                );
            }
            if let Some(category) = &category {
                filter.set(
                    &["items", "categories", "categoryCode"],
                    query_filter(category),
                );
            }
            let filter = (!filter.is_empty()).then(|| filter.into_value());
            let items = manager.list_items(&package_keyname, None, filter).await?;

            let mut table = Table::new(["category", "keyName", "description", "priceId"]);
            table.sortby = Some("category".to_string());
            for item in &items {
                table.add_row(vec![
                    lookup(item, &["itemCategory", "categoryCode"]).into(),
                    item.get("keyName").into(),
                    item.get("description").into(),
                    first_price_id(item),
                ]);
            }
            env.fout(table)
        }
        OrderCommand::PresetList {
            package_keyname,
            keyword,
        } => {
            let filter = keyword.map(|keyword| {
                let operation = query_filter(format!("*= {}", keyword));
                let mut filter = NestedFilter::new();
                filter.set(&["activePresets", "name"], operation.clone());
                filter.set(&["accountRestrictedActivePresets", "name"], operation);
                filter.into_value()
            });
            let presets = manager.list_presets(&package_keyname, None, filter).await?;

            let mut table = Table::new(["name", "keyName", "description"]);
            for preset in &presets {
                table.add_row(vec![
                    preset.get("name").into(),
                    preset.get("keyName").into(),
                    preset.get("description").into(),
                ]);
            }
            env.fout(table)
        }
        OrderCommand::PackageLocations { package_keyname } => {
            let regions = manager.package_locations(&package_keyname).await?;
            let mut table = Table::new(["id", "dc", "description", "keyName"]);
            for region in &regions {
                table.add_row(vec![
                    lookup(region, &["location", "locationId"]).into(),
                    lookup(region, &["location", "location", "name"]).into(),
                    region.get("description").into(),
                    region.get("keyname").into(),
                ]);
            }
            env.fout(table)
        }
        OrderCommand::Place { order, verify } => {
            let request = order.to_request()?;
            if verify {
                let result = manager.verify_order(&request).await?;
                return env.fout(verified_table(&result, request.hourly));
            }
            confirm_charges(env)?;
            let result = manager.place_order(&request).await?;
            env.fout(placed_table(&result))
        }
        OrderCommand::Quote {
            order,
            name,
            send_email,
        } => {
            let request = order.to_request()?;
            let result = manager.place_quote(&request, &name, send_email).await?;

            let mut table = Table::key_value();
            table.add_row(vec!["id".into(), lookup(&result, &["quote", "id"]).into()]);
            table.add_row(vec!["name".into(), lookup(&result, &["quote", "name"]).into()]);
            table.add_row(vec!["created".into(), result.get("orderDate").into()]);
            table.add_row(vec![
                "expires".into(),
                lookup(&result, &["quote", "expirationDate"]).into(),
            ]);
            table.add_row(vec![
                "status".into(),
                lookup(&result, &["quote", "status"]).into(),
            ]);
            env.fout(table)
        }
        OrderCommand::QuoteList => {
            let quotes = manager.get_quotes().await?;
            let mut table = Table::new([
                "id",
                "name",
                "created",
                "modified",
                "status",
                "package",
                "package_id",
            ]);
            for quote in &quotes {
                let package = lookup(quote, &["order", "items"])
                    .and_then(Value::as_array)
                    .and_then(|items| items.first())
                    .and_then(|item| item.get("package"));
                table.add_row(vec![
                    quote.get("id").into(),
                    quote.get("name").into(),
                    clean_time(quote.get("createDate"), "%Y-%m-%d").into(),
                    clean_time(quote.get("modifyDate"), "%Y-%m-%d").into(),
                    quote.get("status").into(),
                    package.and_then(|p| p.get("keyName")).into(),
                    package.and_then(|p| p.get("id")).into(),
                ]);
            }
            env.fout(table)
        }
        OrderCommand::QuoteDetail { quote } => {
            let result = manager.get_quote_details(quote).await?;

            let mut items = Table::new(["id", "category", "description", "quantity", "recurring"]);
            let order_items = lookup(&result, &["order", "items"]).and_then(Value::as_array);
            for item in order_items.into_iter().flatten() {
                items.add_row(vec![
                    item.get("id").into(),
                    item.get("categoryCode").into(),
                    item.get("description").into(),
                    item.get("quantity").into(),
                    item.get("recurringFee").into(),
                ]);
            }

            let mut table = Table::key_value();
            table.add_row(vec!["id".into(), result.get("id").into()]);
            table.add_row(vec!["name".into(), result.get("name").into()]);
            table.add_row(vec!["quote_key".into(), result.get("quoteKey").into()]);
            table.add_row(vec![
                "order_id".into(),
                lookup(&result, &["order", "id"]).into(),
            ]);
            table.add_row(vec![
                "items".into(),
                if items.is_empty() { blank().into() } else { items.into() },
            ]);
            env.fout(table)
        }
        OrderCommand::PlaceQuote {
            quote,
            verify,
            quantity,
            extras,
        } => {
            let extras = parse_json_object(extras.as_deref(), "--extras")?;
            if verify {
                let result = manager.verify_quote(quote, &extras, quantity).await?;
                let hourly = result
                    .get("useHourlyPricing")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                return env.fout(verified_table(&result, hourly));
            }
            confirm_charges(env)?;
            let result = manager.order_quote(quote, &extras, quantity).await?;
            env.fout(placed_table(&result))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::demo_env;
    use crate::config::cli::OutputFormat;
    use serde_json::json;

    fn order_args(items: &[&str]) -> OrderArgs {
        OrderArgs {
            package_keyname: "BARE_METAL_SERVER".to_string(),
            location: "dal13".to_string(),
            order_items: items.iter().map(|item| item.to_string()).collect(),
            preset: None,
            billing: Billing::Hourly,
            complex_type: Some("SoftLayer_Container_Product_Order_Virtual_Guest".to_string()),
            extras: Some(r#"{"hardware": [{"hostname": "test", "domain": "example.com"}]}"#.to_string()),
            quantity: 1,
        }
    }

    #[tokio::test]
    async fn test_package_list_by_type() {
        let (mut env, buffer, transport) = demo_env(OutputFormat::Json, "");
        run(
            &mut env,
            OrderCommand::PackageList {
                keyword: Some("Bare".to_string()),
                package_type: Some("BARE_METAL_CPU".to_string()),
            },
        )
        .await
        .unwrap();

        let call = transport.last_call("Product_Package", "getAllObjects").unwrap();
        let filter = call.filter.unwrap();
        assert_eq!(filter["name"]["operation"], "*= Bare");
        assert_eq!(filter["type"]["keyName"]["operation"], "!= BLUEMIX_SERVICE");

        let out: Value = serde_json::from_str(&buffer.contents()).unwrap();
        let keys: Vec<&str> = out
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row["keyName"].as_str().unwrap())
            .collect();
        assert_eq!(keys, vec!["BARE_METAL_OUTLET", "BARE_METAL_SERVER"]);
    }

    #[tokio::test]
    async fn test_category_list_required() {
        let (mut env, buffer, _) = demo_env(OutputFormat::Json, "");
        run(
            &mut env,
            OrderCommand::CategoryList {
                package_keyname: "BARE_METAL_SERVER".to_string(),
                required: true,
            },
        )
        .await
        .unwrap();

        let out: Value = serde_json::from_str(&buffer.contents()).unwrap();
        assert_eq!(out.as_array().unwrap().len(), 3);
        assert_eq!(
            out[0],
            json!({"name": "Computing Instance", "categoryCode": "guest_core", "isRequired": "Y"})
        );
    }

    #[tokio::test]
    async fn test_item_list() {
        let (mut env, buffer, transport) = demo_env(OutputFormat::Json, "");
        run(
            &mut env,
            OrderCommand::ItemList {
                package_keyname: "BARE_METAL_SERVER".to_string(),
                keyword: None,
                category: Some("ram".to_string()),
            },
        )
        .await
        .unwrap();

        let call = transport.last_call("Product_Package", "getItems").unwrap();
        assert_eq!(call.identifier, Some(200));
        assert_eq!(
            call.filter,
            Some(json!({"items": {"categories": {"categoryCode": {"operation": "_= ram"}}}}))
        );

        let out: Value = serde_json::from_str(&buffer.contents()).unwrap();
        let core = out
            .as_array()
            .unwrap()
            .iter()
            .find(|row| row["keyName"] == "GUEST_CORE_4")
            .unwrap();
        assert_eq!(core["priceId"], 1642);
    }

    #[tokio::test]
    async fn test_preset_list_and_locations() {
        let (mut env, buffer, _) = demo_env(OutputFormat::Jsonraw, "");
        run(
            &mut env,
            OrderCommand::PresetList {
                package_keyname: "BARE_METAL_SERVER".to_string(),
                keyword: None,
            },
        )
        .await
        .unwrap();
        run(
            &mut env,
            OrderCommand::PackageLocations {
                package_keyname: "BARE_METAL_SERVER".to_string(),
            },
        )
        .await
        .unwrap();

        let out = buffer.contents();
        let lines: Vec<&str> = out.lines().collect();
        let presets: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(presets[0]["keyName"], "M1_64X512X25");
        let locations: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(
            locations[1],
            json!({"id": 1854895, "dc": "dal13", "description": "DAL13 - Dallas", "keyName": "DALLAS13"})
        );
    }

    #[tokio::test]
    async fn test_place_verify() {
        let (mut env, buffer, transport) = demo_env(OutputFormat::Json, "");
        run(
            &mut env,
            OrderCommand::Place {
                order: order_args(&["GUEST_CORE_4,RAM_16_GB"]),
                verify: true,
            },
        )
        .await
        .unwrap();

        let call = transport.last_call("Product_Order", "verifyOrder").unwrap();
        let container = &call.args[0]["orderContainers"][0];
        assert_eq!(container["prices"], json!([{"id": 1642}, {"id": 1644}]));
        assert_eq!(container["location"], 1854895);
        assert_eq!(container["hardware"][0]["hostname"], "test");
        assert!(transport.calls_to("Product_Order", "placeOrder").is_empty());

        let out: Value = serde_json::from_str(&buffer.contents()).unwrap();
        assert_eq!(out[0]["cost"], "2.00");
        assert_eq!(out[1]["cost"], "0.50");
    }

    #[tokio::test]
    async fn test_place_requires_confirmation() {
        let (mut env, _, transport) = demo_env(OutputFormat::Json, "n\n");
        let err = run(
            &mut env,
            OrderCommand::Place {
                order: order_args(&["GUEST_CORE_4"]),
                verify: false,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Aborting order.");
        assert!(transport.calls_to("Product_Order", "placeOrder").is_empty());

        let (mut env, buffer, _) = demo_env(OutputFormat::Json, "y\n");
        run(
            &mut env,
            OrderCommand::Place {
                order: order_args(&["GUEST_CORE_4"]),
                verify: false,
            },
        )
        .await
        .unwrap();
        let out: Value = serde_json::from_str(&buffer.contents()).unwrap();
        assert_eq!(out["id"], 1234);
        assert_eq!(out["status"], "PENDING_AUTO_APPROVAL");
    }

    #[tokio::test]
    async fn test_unknown_item_fails() {
        let (mut env, _, _) = demo_env(OutputFormat::Json, "");
        let err = run(
            &mut env,
            OrderCommand::Place {
                order: order_args(&["NOT_AN_ITEM"]),
                verify: true,
            },
        )
        .await
        .unwrap_err();
        assert!(err
            .to_string()
            .contains("Item NOT_AN_ITEM does not exist for package BARE_METAL_SERVER"));
    }

    #[tokio::test]
    async fn test_quote() {
        let (mut env, buffer, transport) = demo_env(OutputFormat::Json, "");
        run(
            &mut env,
            OrderCommand::Quote {
                order: order_args(&["GUEST_CORE_4"]),
                name: "wombat".to_string(),
                send_email: true,
            },
        )
        .await
        .unwrap();

        let call = transport.last_call("Product_Order", "placeQuote").unwrap();
        assert_eq!(call.args[0]["orderContainers"][0]["quoteName"], "wombat");
        assert_eq!(call.args[0]["orderContainers"][0]["sendQuoteEmailFlag"], true);
        let out: Value = serde_json::from_str(&buffer.contents()).unwrap();
        assert_eq!(out["id"], 1234);
        assert_eq!(out["status"], "PENDING");
    }

    #[tokio::test]
    async fn test_quote_list_and_detail() {
        let (mut env, buffer, _) = demo_env(OutputFormat::Jsonraw, "");
        run(&mut env, OrderCommand::QuoteList).await.unwrap();
        run(&mut env, OrderCommand::QuoteDetail { quote: 1234 }).await.unwrap();

        let out = buffer.contents();
        let lines: Vec<&str> = out.lines().collect();
        let quotes: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(quotes[0]["package"], "CLOUD_SERVER");
        assert_eq!(quotes[0]["created"], "2019-04-10");
        let detail: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(detail["order_id"], 37623333);
        assert_eq!(detail["items"][0]["category"], "guest_core");
    }

    #[tokio::test]
    async fn test_place_quote() {
        let (mut env, buffer, transport) = demo_env(OutputFormat::Jsonraw, "");
        env.skip_confirmations = true;
        run(
            &mut env,
            OrderCommand::PlaceQuote {
                quote: 1234,
                verify: false,
                quantity: 2,
                extras: Some(r#"{"hostname": "test"}"#.to_string()),
            },
        )
        .await
        .unwrap();

        let call = transport.last_call("Billing_Order_Quote", "placeOrder").unwrap();
        assert_eq!(call.identifier, Some(1234));
        assert_eq!(
            call.args[0],
            json!({"prices": [{"id": 1921}], "quantity": 2, "packageId": 50, "hostname": "test"})
        );
        let out: Value = serde_json::from_str(&buffer.contents()).unwrap();
        assert_eq!(out["status"], "PENDING_AUTO_APPROVAL");
    }

    #[tokio::test]
    async fn test_place_quote_verify() {
        let (mut env, buffer, _) = demo_env(OutputFormat::Jsonraw, "");
        run(
            &mut env,
            OrderCommand::PlaceQuote {
                quote: 1234,
                verify: true,
                quantity: 1,
                extras: None,
            },
        )
        .await
        .unwrap();
        let out: Value = serde_json::from_str(&buffer.contents()).unwrap();
        assert_eq!(out[0], json!({"keyName": "TheThing", "description": "this is a thing", "cost": "2.00"}));
    }
}
