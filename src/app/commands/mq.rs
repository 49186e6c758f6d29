use crate::app::environment::Environment;
use crate::app::formatting::{listing, FormattedItem, Table};
use crate::managers::messaging::MessagingConnection;
use crate::managers::MessagingManager;
use crate::utils::error::{Result, SoftLayerError};
use crate::utils::filter::lookup;
use clap::{Args, Subcommand};
use serde_json::{json, Map, Value};

/// 佇列與主題指令共用的端點選項
#[derive(Debug, Clone, Args)]
pub struct EndpointArgs {
    /// Datacenter, e.g. dal05
    #[arg(long)]
    pub datacenter: Option<String>,
    /// Network, public or private
    #[arg(long, value_parser = ["public", "private"])]
    pub network: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum MqCommand {
    /// List message queue accounts
    AccountsList,
    /// List all service endpoints
    EndpointsList,
    /// Ping the message queue service
    Ping {
        #[command(flatten)]
        endpoint: EndpointArgs,
    },
    /// List all queues on an account
    QueueList {
        account_id: String,
        #[command(flatten)]
        endpoint: EndpointArgs,
    },
    /// Detail a queue
    QueueDetail {
        account_id: String,
        queue_name: String,
        #[command(flatten)]
        endpoint: EndpointArgs,
    },
    /// Create a queue
    QueueAdd {
        account_id: String,
        queue_name: String,
        /// Time in seconds that messages will re-appear after being popped
        #[arg(long = "visibility-interval", default_value_t = 30)]
        visibility_interval: i64,
        /// Time in seconds that messages will live
        #[arg(long, default_value_t = 604800)]
        expiration: i64,
        /// Tag to add to the queue; repeat for more
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[command(flatten)]
        endpoint: EndpointArgs,
    },
    /// Delete a queue or a single message
    QueueRemove {
        account_id: String,
        queue_name: String,
        message_id: Option<String>,
        /// Remove the queue even when it has messages
        #[arg(long)]
        force: bool,
        #[command(flatten)]
        endpoint: EndpointArgs,
    },
    /// Push a message into a queue
    QueuePush {
        account_id: String,
        queue_name: String,
        message: String,
        #[command(flatten)]
        endpoint: EndpointArgs,
    },
    /// Pops messages from a queue
    QueuePop {
        account_id: String,
        queue_name: String,
        /// Count of messages to pop
        #[arg(long, default_value_t = 1)]
        count: u32,
        /// Remove popped messages from the queue
        #[arg(long = "delete-after")]
        delete_after: bool,
        #[command(flatten)]
        endpoint: EndpointArgs,
    },
    /// List all topics on an account
    TopicList {
        account_id: String,
        #[command(flatten)]
        endpoint: EndpointArgs,
    },
    /// Detail a topic and its subscriptions
    TopicDetail {
        account_id: String,
        topic_name: String,
        #[command(flatten)]
        endpoint: EndpointArgs,
    },
    /// Create a topic
    TopicAdd {
        account_id: String,
        topic_name: String,
        /// Tag to add to the topic; repeat for more
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[command(flatten)]
        endpoint: EndpointArgs,
    },
    /// Delete a topic
    TopicRemove {
        account_id: String,
        topic_name: String,
        /// Remove the topic even when it has subscriptions
        #[arg(long)]
        force: bool,
        #[command(flatten)]
        endpoint: EndpointArgs,
    },
    /// Push a message into a topic
    TopicPush {
        account_id: String,
        topic_name: String,
        message: String,
        #[command(flatten)]
        endpoint: EndpointArgs,
    },
    /// Create a subscription on a topic
    TopicSubscribe {
        account_id: String,
        topic_name: String,
        /// Type of endpoint
        #[arg(long = "type", value_parser = ["queue", "http"], default_value = "queue")]
        endpoint_type: String,
        /// Queue name, for queue subscriptions
        #[arg(long = "queue-name")]
        queue_name: Option<String>,
        /// HTTP method, for http subscriptions
        #[arg(long = "http-method", default_value = "POST")]
        http_method: String,
        /// URL to request, for http subscriptions
        #[arg(long = "http-url")]
        http_url: Option<String>,
        /// HTTP body template, for http subscriptions
        #[arg(long = "http-body")]
        http_body: Option<String>,
        #[command(flatten)]
        endpoint: EndpointArgs,
    },
    /// Remove a subscription on a topic
    TopicUnsubscribe {
        account_id: String,
        topic_name: String,
        subscription_id: String,
        #[command(flatten)]
        endpoint: EndpointArgs,
    },
}

fn items(value: &Value) -> Vec<Value> {
    lookup(value, &["items"])
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn tags_cell(value: &Value) -> FormattedItem {
    let tags = lookup(value, &["tags"])
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    listing(tags.iter().filter_map(Value::as_str), ",")
}

fn queue_table(queue: &Value) -> Table {
    let mut table = Table::key_value();
    table.add_row(vec!["name".into(), queue.get("name").into()]);
    table.add_row(vec!["tags".into(), tags_cell(queue).into()]);
    table.add_row(vec!["visibility_interval".into(), queue.get("visibility_interval").into()]);
    table.add_row(vec!["expiration".into(), queue.get("expiration").into()]);
    table.add_row(vec!["message_count".into(), queue.get("message_count").into()]);
    table.add_row(vec!["visible_message_count".into(), queue.get("visible_message_count").into()]);
    table
}

fn message_table(message: &Value) -> Table {
    let mut table = Table::key_value();
    table.add_row(vec!["id".into(), message.get("id").into()]);
    table.add_row(vec!["initial_entry_time".into(), message.get("initial_entry_time").into()]);
    table.add_row(vec!["visibility_delay".into(), message.get("visibility_delay").into()]);
    table.add_row(vec!["visibility_interval".into(), message.get("visibility_interval").into()]);
    table.add_row(vec!["fields".into(), message.get("fields").into()]);
    table.add_row(vec!["body".into(), message.get("body").into()]);
    table
}

fn topic_table(topic: &Value) -> Table {
    let mut table = Table::key_value();
    table.add_row(vec!["name".into(), topic.get("name").into()]);
    table.add_row(vec!["tags".into(), tags_cell(topic).into()]);
    table
}

fn subscription_table(subscription: &Value) -> Table {
    let mut table = Table::key_value();
    table.add_row(vec!["id".into(), subscription.get("id").into()]);
    table.add_row(vec!["endpoint_type".into(), subscription.get("endpoint_type").into()]);
    if let Some(Value::Object(endpoint)) = subscription.get("endpoint") {
        for (key, value) in endpoint {
            table.add_row(vec![key.as_str().into(), value.into()]);
        }
    }
    table
}

async fn connect(
    manager: &MessagingManager,
    account_id: &str,
    endpoint: &EndpointArgs,
) -> Result<MessagingConnection> {
    manager
        .get_connection(
            account_id,
            endpoint.datacenter.as_deref(),
            endpoint.network.as_deref(),
        )
        .await
}

pub async fn run(env: &mut Environment, cmd: MqCommand) -> Result<()> {
    let manager = MessagingManager::new(env.client.clone());
    match cmd {
        MqCommand::AccountsList => {
            let accounts = manager.list_accounts().await?;
            let mut table = Table::new(["id", "name", "status"]);
            for account in &accounts {
                table.add_row(vec![
                    account
                        .get("nodes")
                        .and_then(|nodes| nodes.get(0))
                        .and_then(|node| node.get("accountName"))
                        .into(),
                    account.get("name").into(),
                    lookup(account, &["status", "name"]).into(),
                ]);
            }
            env.fout(table)
        }
        MqCommand::EndpointsList => {
            let mut table = Table::new(["datacenter", "public", "private"]);
            for (datacenter, public, private) in manager.get_endpoints() {
                table.add_row(vec![
                    (*datacenter).into(),
                    format!("https://{}", public).into(),
                    format!("https://{}", private).into(),
                ]);
            }
            env.fout(table)
        }
        MqCommand::Ping { endpoint } => {
            manager
                .ping(endpoint.datacenter.as_deref(), endpoint.network.as_deref())
                .await?;
            env.out("OK")
        }
        MqCommand::QueueList {
            account_id,
            endpoint,
        } => {
            let connection = connect(&manager, &account_id, &endpoint).await?;
            let queues = connection.get_queues(&[]).await?;
            let mut table = Table::new(["name", "message_count", "visible_message_count"]);
            for queue in items(&queues) {
                table.add_row(vec![
                    queue.get("name").into(),
                    queue.get("message_count").into(),
                    queue.get("visible_message_count").into(),
                ]);
            }
            env.fout(table)
        }
        MqCommand::QueueDetail {
            account_id,
            queue_name,
            endpoint,
        } => {
            let connection = connect(&manager, &account_id, &endpoint).await?;
            let queue = connection.get_queue(&queue_name).await?;
            env.fout(queue_table(&queue))
        }
        MqCommand::QueueAdd {
            account_id,
            queue_name,
            visibility_interval,
            expiration,
            tags,
            endpoint,
        } => {
            let connection = connect(&manager, &account_id, &endpoint).await?;
            let queue = connection
                .create_queue(
                    &queue_name,
                    json!({
                        "visibility_interval": visibility_interval,
                        "expiration": expiration,
                        "tags": tags,
                    }),
                )
                .await?;
            env.fout(queue_table(&queue))
        }
        MqCommand::QueueRemove {
            account_id,
            queue_name,
            message_id,
            force,
            endpoint,
        } => {
            let connection = connect(&manager, &account_id, &endpoint).await?;
            match message_id {
                Some(message_id) => {
                    connection.delete_message(&queue_name, &message_id).await?;
                }
                None => {
                    connection.delete_queue(&queue_name, force).await?;
                }
            }
            Ok(())
        }
        MqCommand::QueuePush {
            account_id,
            queue_name,
            message,
            endpoint,
        } => {
            let connection = connect(&manager, &account_id, &endpoint).await?;
            let pushed = connection
                .push_queue_message(&queue_name, &message, None)
                .await?;
            env.fout(message_table(&pushed))
        }
        MqCommand::QueuePop {
            account_id,
            queue_name,
            count,
            delete_after,
            endpoint,
        } => {
            let connection = connect(&manager, &account_id, &endpoint).await?;
            let popped = connection.pop_messages(&queue_name, count).await?;
            let mut tables = Vec::new();
            for message in items(&popped) {
                if delete_after {
                    if let Some(message_id) = message.get("id").and_then(Value::as_str) {
                        connection.delete_message(&queue_name, message_id).await?;
                    }
                }
                tables.push(message_table(&message));
            }
            env.fout(tables)
        }
        MqCommand::TopicList {
            account_id,
            endpoint,
        } => {
            let connection = connect(&manager, &account_id, &endpoint).await?;
            let topics = connection.get_topics(&[]).await?;
            let mut table = Table::new(["name"]);
            for topic in items(&topics) {
                table.add_row(vec![topic.get("name").into()]);
            }
            env.fout(table)
        }
        MqCommand::TopicDetail {
            account_id,
            topic_name,
            endpoint,
        } => {
            let connection = connect(&manager, &account_id, &endpoint).await?;
            let topic = connection.get_topic(&topic_name).await?;
            let subscriptions = connection.get_subscriptions(&topic_name).await?;
            let mut tables = vec![topic_table(&topic)];
            tables.extend(items(&subscriptions).iter().map(subscription_table));
            env.fout(tables)
        }
        MqCommand::TopicAdd {
            account_id,
            topic_name,
            tags,
            endpoint,
        } => {
            let connection = connect(&manager, &account_id, &endpoint).await?;
            let topic = connection
                .create_topic(&topic_name, json!({ "tags": tags }))
                .await?;
            env.fout(topic_table(&topic))
        }
        MqCommand::TopicRemove {
            account_id,
            topic_name,
            force,
            endpoint,
        } => {
            let connection = connect(&manager, &account_id, &endpoint).await?;
            connection.delete_topic(&topic_name, force).await?;
            Ok(())
        }
        MqCommand::TopicPush {
            account_id,
            topic_name,
            message,
            endpoint,
        } => {
            let connection = connect(&manager, &account_id, &endpoint).await?;
            let pushed = connection
                .push_topic_message(&topic_name, &message, None)
                .await?;
            env.fout(message_table(&pushed))
        }
        MqCommand::TopicSubscribe {
            account_id,
            topic_name,
            endpoint_type,
            queue_name,
            http_method,
            http_url,
            http_body,
            endpoint,
        } => {
            let target = subscription_endpoint(
                &endpoint_type,
                queue_name,
                http_method,
                http_url,
                http_body,
            )?;
            let connection = connect(&manager, &account_id, &endpoint).await?;
            let subscription = connection
                .create_subscription(&topic_name, &endpoint_type, target)
                .await?;
            env.fout(subscription_table(&subscription))
        }
        MqCommand::TopicUnsubscribe {
            account_id,
            topic_name,
            subscription_id,
            endpoint,
        } => {
            let connection = connect(&manager, &account_id, &endpoint).await?;
            connection
                .delete_subscription(&topic_name, &subscription_id)
                .await?;
            Ok(())
        }
    }
}

/// queue 訂閱要佇列名稱，http 訂閱要 URL
fn subscription_endpoint(
    endpoint_type: &str,
    queue_name: Option<String>,
    http_method: String,
    http_url: Option<String>,
    http_body: Option<String>,
) -> Result<Value> {
    let mut target = Map::new();
    if endpoint_type == "queue" {
        let queue_name = queue_name.ok_or_else(|| {
            SoftLayerError::argument("--queue-name is required for queue subscriptions")
        })?;
        target.insert("queue_name".to_string(), json!(queue_name));
    } else {
        let url = http_url.ok_or_else(|| {
            SoftLayerError::argument("--http-url is required for http subscriptions")
        })?;
        target.insert("method".to_string(), json!(http_method));
        target.insert("url".to_string(), json!(url));
        if let Some(body) = http_body {
            target.insert("body".to_string(), json!(body));
        }
    }
    Ok(Value::Object(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::demo_env;
    use crate::config::cli::OutputFormat;

    #[tokio::test]
    async fn test_accounts_list() {
        let (mut env, buffer, _) = demo_env(OutputFormat::Json, "");
        run(&mut env, MqCommand::AccountsList).await.unwrap();
        let out: Value = serde_json::from_str(&buffer.contents()).unwrap();
        assert_eq!(out[0]["id"], "abcdefg");
        assert_eq!(out[0]["name"], "Example Account");
        assert_eq!(out[0]["status"], "Active");
    }

    #[tokio::test]
    async fn test_endpoints_list() {
        let (mut env, buffer, _) = demo_env(OutputFormat::Json, "");
        run(&mut env, MqCommand::EndpointsList).await.unwrap();
        let out: Value = serde_json::from_str(&buffer.contents()).unwrap();
        assert_eq!(out[0]["datacenter"], "dal05");
        assert_eq!(out[0]["public"], "https://dal05.mq.softlayer.net");
    }

    #[tokio::test]
    async fn test_queue_list_needs_api_key() {
        let (mut env, _, _) = demo_env(OutputFormat::Json, "");
        let err = run(
            &mut env,
            MqCommand::QueueList {
                account_id: "abcdefg".to_string(),
                endpoint: EndpointArgs {
                    datacenter: None,
                    network: None,
                },
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn test_subscription_endpoint() {
        let queue = subscription_endpoint("queue", Some("jobs".to_string()), "POST".to_string(), None, None)
            .unwrap();
        assert_eq!(queue, json!({"queue_name": "jobs"}));

        let http = subscription_endpoint(
            "http",
            None,
            "GET".to_string(),
            Some("http://example.com/hook".to_string()),
            None,
        )
        .unwrap();
        assert_eq!(http["method"], "GET");
        assert_eq!(http["url"], "http://example.com/hook");

        let err = subscription_endpoint("http", None, "POST".to_string(), None, None).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
