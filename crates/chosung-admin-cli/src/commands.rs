//! Command parsing and execution.

use anyhow::{bail, Context, Result};
use chosung_admin_core::api::{PageRequest, SortDirection};
use chosung_admin_core::models::VisitorPeriod;
use chosung_admin_core::{AdminClient, Config, GuardDecision, RouteGuard};
use tracing::debug;

pub const USAGE: &str = "\
Usage: chosung-admin <command> [args]

Commands:
  login [email]          Log in (prompts for the password)
  logout                 End the session and clear stored credentials
  status [path]          Show whether a dashboard path is accessible
  stats                  Dashboard summary numbers
  visitors               Daily, weekly and monthly visitor counts
  ranking                User ranking
  games [page]           Per-topic game statistics
  topics [page]          Topic list
  users [page]           User list
  admins                 Administrator list
  delete-topic <id>      Delete a topic
  delete-user <id>       Delete a user
  delete-admin <id>...   Delete one or more administrators
  help                   Show this message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login(Option<String>),
    Logout,
    Status(String),
    Stats,
    Visitors,
    Ranking,
    Games(u32),
    Topics(u32),
    Users(u32),
    Admins,
    DeleteTopic(i64),
    DeleteUser(i64),
    DeleteAdmins(Vec<i64>),
    Help,
}

fn page_arg(args: &[String]) -> Result<u32> {
    match args.get(1) {
        Some(raw) => raw
            .parse::<u32>()
            .ok()
            .filter(|p| *p >= 1)
            .with_context(|| format!("Invalid page number: {}", raw)),
        None => Ok(1),
    }
}

fn id_arg(args: &[String]) -> Result<i64> {
    let raw = args.get(1).context("Missing id")?;
    raw.parse().with_context(|| format!("Invalid id: {}", raw))
}

fn id_list(args: &[String]) -> Result<Vec<i64>> {
    if args.len() < 2 {
        bail!("Missing id");
    }
    args[1..]
        .iter()
        .map(|raw| raw.parse().with_context(|| format!("Invalid id: {}", raw)))
        .collect()
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self> {
        let Some(name) = args.first() else {
            return Ok(Command::Help);
        };
        let command = match name.as_str() {
            "login" => Command::Login(args.get(1).cloned()),
            "logout" => Command::Logout,
            "status" => Command::Status(args.get(1).cloned().unwrap_or_else(|| "/".to_string())),
            "stats" => Command::Stats,
            "visitors" => Command::Visitors,
            "ranking" => Command::Ranking,
            "games" => Command::Games(page_arg(args)?),
            "topics" => Command::Topics(page_arg(args)?),
            "users" => Command::Users(page_arg(args)?),
            "admins" => Command::Admins,
            "delete-topic" => Command::DeleteTopic(id_arg(args)?),
            "delete-user" => Command::DeleteUser(id_arg(args)?),
            "delete-admin" => Command::DeleteAdmins(id_list(args)?),
            "help" | "--help" | "-h" => Command::Help,
            other => bail!("Unknown command: {}", other),
        };
        Ok(command)
    }

    /// Dashboard view this command stands in for.
    fn view_path(&self) -> &str {
        match self {
            Command::Login(_) | Command::Help => "/login",
            Command::Status(path) => path.as_str(),
            Command::Logout | Command::Stats | Command::Ranking => "/",
            Command::Visitors => "/visitor",
            Command::Games(_) => "/gameStat",
            Command::Topics(_) | Command::DeleteTopic(_) => "/topicSetting",
            Command::Users(_) | Command::DeleteUser(_) => "/userSetting",
            Command::Admins | Command::DeleteAdmins(_) => "/adminSetting",
        }
    }
}

pub async fn run(client: &AdminClient, config: &mut Config, command: Command) -> Result<()> {
    let guard = RouteGuard::new(&config.public_url);
    let decision = guard.evaluate(client.session_state(), command.view_path());
    debug!(path = command.view_path(), ?decision, "Route guard evaluated");

    if let Command::Status(ref path) = command {
        match decision {
            GuardDecision::Render => println!("{}: logged in, view accessible", path),
            GuardDecision::Redirect(ref to) => println!("{}: not logged in, redirects to {}", path, to),
        }
        return Ok(());
    }
    if let GuardDecision::Redirect(to) = decision {
        bail!("Not logged in (redirected to {}). Run `chosung-admin login` first.", to);
    }

    match command {
        Command::Login(email) => login(client, config, email).await,
        Command::Logout => {
            client.logout().await.context("Logout call failed (local session cleared)")?;
            println!("Logged out.");
            Ok(())
        }
        Command::Stats => {
            let stats = client.dashboard_stats().await?;
            println!("Total visitors      {:>8}", stats.total_visitors);
            println!("Daily active users  {:>8}", stats.daily_active_users);
            println!("Daily game plays    {:>8}", stats.daily_game_plays);
            println!("Total users         {:>8}", stats.total_users);
            println!("Average rating      {:>8.2}", stats.average_rating);
            Ok(())
        }
        Command::Visitors => {
            for period in [VisitorPeriod::Daily, VisitorPeriod::Weekly, VisitorPeriod::Monthly] {
                println!("[{}]", period.label());
                for bucket in client.visitors(period).await? {
                    println!("  {:<12} {:>8}", bucket.date, bucket.count);
                }
            }
            println!("Total: {}", client.total_visitors().await?);
            Ok(())
        }
        Command::Ranking => {
            for entry in client.user_ranking().await? {
                println!(
                    "{:>3}. {:<20} badges {:>4}  hearts {:>4}",
                    entry.rank, entry.nickname, entry.total_badges, entry.total_hearts
                );
            }
            Ok(())
        }
        Command::Games(page) => {
            let request = PageRequest::new("usageCount").page(page);
            let result = client.game_stats(&request).await?;
            for stat in &result.stats {
                println!(
                    "{:>5} {:<20} plays {:>6}  complete {:>6.2}%  correct {:>6.2}%",
                    stat.topic_id,
                    stat.title,
                    stat.usage_count,
                    stat.average_complete_play_rate,
                    stat.average_correction_rate
                );
            }
            println!("page {}/{}", page, result.total_page.max(1));
            Ok(())
        }
        Command::Topics(page) => {
            let request = PageRequest::new("topicId").page(page);
            let result = client.topics(&request).await?;
            for topic in &result.topics {
                println!(
                    "{:>5} {:<20} {:<10} questions {:>4}  updated {}",
                    topic.topic_id,
                    topic.topic_text,
                    topic.topic_status,
                    topic.topic_question_count,
                    topic.topic_update_date
                );
            }
            println!("page {}/{}", page, result.total_page.max(1));
            Ok(())
        }
        Command::Users(page) => {
            let request = PageRequest::new("userId")
                .sorted("userId", SortDirection::Ascending)
                .page(page);
            let result = client.users(&request).await?;
            for user in &result.users {
                println!(
                    "{:>6} {:<20} {:<30} {}",
                    user.user_id,
                    user.nickname,
                    user.email,
                    user.location.as_deref().unwrap_or("-")
                );
            }
            println!("page {}/{} ({} users)", page, result.total_page.max(1), result.total_count);
            Ok(())
        }
        Command::Admins => {
            let result = client.admins().await?;
            for admin in &result.admins {
                println!(
                    "{:>4} {:<30} {:<6} created {}",
                    admin.admin_id, admin.admin_email, admin.admin_active, admin.created_at
                );
            }
            Ok(())
        }
        Command::DeleteTopic(id) => {
            client.delete_topic(id).await?;
            println!("Topic {} deleted.", id);
            Ok(())
        }
        Command::DeleteUser(id) => {
            client.delete_user(id).await?;
            println!("User {} deleted.", id);
            Ok(())
        }
        Command::DeleteAdmins(ids) => {
            client.delete_admins(&ids).await?;
            println!("Deleted {} admin(s).", ids.len());
            Ok(())
        }
        Command::Status(_) | Command::Help => Ok(()),
    }
}

async fn login(client: &AdminClient, config: &mut Config, email: Option<String>) -> Result<()> {
    let email = match email.or_else(|| config.last_email.clone()) {
        Some(email) => email,
        None => bail!("Usage: chosung-admin login <email>"),
    };
    let password = rpassword::prompt_password(format!("Password for {}: ", email))
        .context("Failed to read password")?;

    client.login(&email, &password).await?;

    if config.last_email.as_deref() != Some(email.as_str()) {
        config.last_email = Some(email.clone());
        config.save().context("Failed to save config")?;
    }
    println!("Logged in as {}.", email);
    Ok(())
}
