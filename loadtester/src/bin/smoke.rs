//! Runs one scenario's journey a few times as a single user, without the
//! load harness, and prints per-request timings.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use loadtester::client::HttpClient;
use loadtester::discussions::channels::CHANNEL_TYPE_PUBLIC;
use loadtester::scenario::channels::{self, Reader};
use loadtester::scenario::discussion_users::{self, DiscussionUsersContext};
use loadtester::scenario::micromasters::{self, Learner};
use loadtester::scenario::rapid_response::{self, EnrolledUsers};
use loadtester::scenario::Outcome;
use loadtester::settings::Settings;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "smoke")]
#[command(about = "Single-user smoke run of a load test scenario", long_about = None)]
struct Cli {
    #[arg(value_enum)]
    scenario: SmokeScenario,

    /// Times the journey is repeated
    #[arg(long, short, default_value = "1")]
    iterations: usize,

    /// Settings file, overrides LOADTEST_CONFIG
    #[arg(long, env = "LOADTEST_CONFIG")]
    config: Option<String>,

    /// Create the channel before using it
    #[arg(long)]
    create_channel: bool,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum SmokeScenario {
    Micromasters,
    RapidResponse,
    DiscussionUsers,
    Channels,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();
    let settings = Settings::load_from(cli.config.as_deref()).context("Failed to load settings")?;

    let client = match cli.scenario {
        SmokeScenario::Micromasters => run_micromasters(&settings, cli.iterations).await?,
        SmokeScenario::RapidResponse => run_rapid_response(&settings, cli.iterations).await?,
        SmokeScenario::DiscussionUsers => run_discussion_users(&settings, cli.iterations).await?,
        SmokeScenario::Channels => {
            run_channels(&settings, cli.iterations, cli.create_channel).await?
        }
    };
    println!("{}", client.statistics());
    Ok(())
}

async fn run_micromasters(settings: &Settings, iterations: usize) -> anyhow::Result<HttpClient> {
    let mut client = HttpClient::new(settings.micromasters.base_url.clone());
    for _ in 0..iterations {
        let mut learner = Learner::random(&settings.usernames_in_edx).context("Empty username pool")?;
        micromasters::login_and_profile(&mut client, &settings.micromasters, &mut learner).await?;
    }
    Ok(client)
}

async fn run_rapid_response(settings: &Settings, iterations: usize) -> anyhow::Result<HttpClient> {
    let rapid = &settings.rapid_response;
    let mut client = HttpClient::new(rapid.lms_base_url.clone());
    let enrolled = EnrolledUsers::default();
    let learner = rapid_response::Learner::random(&settings.usernames_in_edx, &rapid.course_data)
        .context("No course data configured")?;
    for _ in 0..iterations {
        rapid_response::login_and_enroll(&mut client, rapid, &learner, &enrolled).await?;
        if rapid_response::submit_answer(&mut client, &learner).await? == Outcome::Interrupted {
            anyhow::bail!("{} is not logged in after login", learner.username);
        }
    }
    Ok(client)
}

async fn run_discussion_users(settings: &Settings, iterations: usize) -> anyhow::Result<HttpClient> {
    let mut client = HttpClient::new(settings.open_discussions.base_url.clone());
    let ctx = DiscussionUsersContext::new(settings)?;
    let mut created = Vec::new();
    for _ in 0..iterations {
        discussion_users::create_user(&mut client, &ctx, &mut created).await?;
        discussion_users::update_user(&mut client, &ctx, &created).await?;
    }
    tracing::info!(created = created.len(), "discussion users done");
    Ok(client)
}

async fn run_channels(
    settings: &Settings,
    iterations: usize,
    create_channel: bool,
) -> anyhow::Result<HttpClient> {
    let discussions = &settings.open_discussions;
    let mut client = HttpClient::new(discussions.reddit_url.clone());
    let username = settings
        .usernames_in_edx
        .first()
        .context("Empty username pool")?;
    let channel_name = discussions
        .channel_names
        .first()
        .context("No channel configured")?
        .clone();
    let api = channels::connect(&mut client, settings, username).await?;
    if create_channel {
        api.create_channel(&mut client, &channel_name, "Load test channel", CHANNEL_TYPE_PUBLIC, &[])
            .await?;
        api.add_subscriber(&mut client, username, &channel_name).await?;
    }
    let reader = Reader { api, channel_name };
    for _ in 0..iterations {
        channels::browse(&mut client, &reader).await?;
        channels::discuss(&mut client, &reader).await?;
    }
    Ok(client)
}

