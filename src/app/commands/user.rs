use crate::app::environment::Environment;
use crate::app::formatting::Table;
use crate::app::helpers::resolve_id;
use crate::managers::UserManager;
use crate::utils::error::Result;
use crate::utils::filter::lookup;
use clap::Subcommand;
use serde_json::Value;

#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// List users
    List {
        /// Column to sort by
        #[arg(long, value_parser = ["id", "username", "displayName", "status", "hardwareCount", "virtualGuestCount"])]
        sortby: Option<String>,
    },
    /// User details
    Detail { identifier: String },
}

fn user_table(users: &[Value], sortby: Option<String>) -> Table {
    let mut table = Table::new([
        "id",
        "username",
        "displayName",
        "status",
        "hardwareCount",
        "virtualGuestCount",
    ]);
    table.sortby = sortby;
    for user in users {
        table.add_row(vec![
            user.get("id").into(),
            user.get("username").into(),
            user.get("displayName").into(),
            lookup(user, &["userStatus", "name"]).into(),
            user.get("hardwareCount").into(),
            user.get("virtualGuestCount").into(),
        ]);
    }
    table
}

pub async fn run(env: &mut Environment, cmd: UserCommand) -> Result<()> {
    let manager = UserManager::new(env.client.clone());
    match cmd {
        UserCommand::List { sortby } => {
            let users = manager.list_users(None, None).await?;
            env.fout(user_table(&users, sortby))
        }
        UserCommand::Detail { identifier } => {
            let user_id = resolve_id(&manager, &identifier, "username").await?;
            let user = manager.get_user(user_id, None).await?;

            let mut table = Table::key_value();
            table.add_row(vec!["Id".into(), user.get("id").into()]);
            table.add_row(vec!["Username".into(), user.get("username").into()]);
            table.add_row(vec!["Name".into(), user.get("displayName").into()]);
            table.add_row(vec!["Email".into(), user.get("email").into()]);
            table.add_row(vec!["Company".into(), user.get("companyName").into()]);
            table.add_row(vec!["Status".into(), lookup(&user, &["userStatus", "name"]).into()]);
            table.add_row(vec!["Parent User".into(), lookup(&user, &["parent", "username"]).into()]);
            table.add_row(vec!["Created".into(), user.get("createDate").into()]);
            env.fout(table)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::demo_env;
    use crate::config::cli::OutputFormat;

    #[tokio::test]
    async fn test_list_users() {
        let (mut env, buffer, _) = demo_env(OutputFormat::Json, "");
        run(&mut env, UserCommand::List { sortby: None }).await.unwrap();
        let out: Value = serde_json::from_str(&buffer.contents()).unwrap();
        assert_eq!(out.as_array().unwrap().len(), 2);
        assert_eq!(out[1]["status"], "Disabled");
    }

    #[tokio::test]
    async fn test_detail_by_username() {
        let (mut env, buffer, transport) = demo_env(OutputFormat::Json, "");
        run(
            &mut env,
            UserCommand::Detail {
                identifier: "SL1234-5".to_string(),
            },
        )
        .await
        .unwrap();
        let call = transport.last_call("User_Customer", "getObject").unwrap();
        assert_eq!(call.identifier, Some(11101));
        let out: Value = serde_json::from_str(&buffer.contents()).unwrap();
        assert_eq!(out["Parent User"], "SL1234");
        assert_eq!(out["Status"], "Active");
    }
}
