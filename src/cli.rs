use chrono::Local;
use clap::{Parser, Subcommand};
use snafu::{ensure, ResultExt as _};

use crate::api;
use crate::auth::{Authenticator, ClientSecrets};
use crate::config::Config;
use crate::error::{
    ApplicationError, AuthorizeSnafu, LoadVideosSnafu, NoVideosSnafu, PromptSnafu, UpdateSheetSnafu,
};
use crate::prompt::{Console, Prompt};
use crate::report::{survey, video_heading, views_line};
use crate::sheets::GoogleSheets;
use crate::source::{Channel, ManualEntry, VideoFile, VideoSource};
use crate::tracker::Tracker;
use crate::youtube::{VideoRef, YouTube};

/// Typed to leave the lookup loop.
pub const QUIT: &str = "quit";

const INVALID_VIDEO_URL: &str = "❌ Please enter a valid YouTube video URL";

/// Track YouTube view counts by scraping the public video pages.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Look up the view count of one video at a time
    Lookup,

    /// Add up the views of a channel's latest videos or of a list of videos
    Analyze {
        /// Channel page to analyze, skips the menu
        #[arg(long)]
        channel: Option<String>,
    },

    /// Append today's view counts of the videos in the video file to the spreadsheet
    Update,

    /// Enter videos to track, then update once or on the weekly schedule
    Track,

    /// Serve `POST /update` for external schedulers
    Serve,
}

impl Cli {
    pub async fn run(self, config: Config) -> Result<(), ApplicationError> {
        let client = reqwest::Client::new();
        let youtube = YouTube::new(client.clone());

        match self.command {
            Command::Lookup => lookup(&youtube, &mut console()?).await,
            Command::Analyze { channel } => analyze(&youtube, &mut console()?, channel).await?,
            Command::Update => update(&config, &client).await?,
            Command::Track => track(&config, &client, &mut console()?).await?,
            Command::Serve => api::serve(config).await?,
        }

        Ok(())
    }
}

fn console() -> Result<Console, ApplicationError> {
    Console::new().context(PromptSnafu)
}

/// Asks for watch URLs until [QUIT] and prints each view count.
pub async fn lookup<P: Prompt>(youtube: &YouTube, prompt: &mut P) {
    loop {
        let Some(line) = prompt.ask(&format!("YouTube video URL ('{QUIT}' to exit): ")) else {
            break;
        };

        let line = line.trim();
        if line.eq_ignore_ascii_case(QUIT) {
            break;
        }

        let Ok(video) = VideoRef::parse(line, None) else {
            prompt.say(INVALID_VIDEO_URL);
            continue;
        };

        prompt.say(&views_line(youtube.fetch_view_count(video.url()).await));
    }
}

pub async fn analyze<P: Prompt>(
    youtube: &YouTube, prompt: &mut P, channel: Option<String>,
) -> Result<(), ApplicationError> {
    let channel = match channel {
        Some(url) => Some(url),
        None => {
            prompt.say("1. Analyze a whole channel");
            prompt.say("2. Enter a list of video URLs");

            match prompt.ask("Choose (1 or 2): ").as_deref().map(str::trim) {
                Some("1") => {
                    let url = prompt.ask("YouTube channel URL: ").unwrap_or_default();
                    if url.trim().is_empty() {
                        prompt.say("❌ Please enter a valid channel URL");
                        return Ok(());
                    }
                    Some(url.trim().to_string())
                }
                Some("2") => None,
                _ => {
                    prompt.say("❌ Invalid choice");
                    return Ok(());
                }
            }
        }
    };

    let videos = match channel {
        Some(url) => {
            prompt.say(&format!("Analyzing channel: {url}"));
            let videos = Channel::new(youtube, url).videos().await.context(LoadVideosSnafu)?;

            if videos.is_empty() {
                prompt.say("❌ Could not get the channel's video list");
                prompt.say("💡 Make sure the channel is public, or enter the video URLs directly");
                return Ok(());
            }
            videos
        }
        None => ManualEntry::new(prompt).videos().await.context(LoadVideosSnafu)?,
    };

    if videos.is_empty() {
        prompt.say("❌ No valid video URLs were entered");
        return Ok(());
    }

    prompt.say(&format!("Analyzing {} videos...", videos.len()));

    let total = videos.len();
    let (tally, _) = survey(youtube, &videos, |index, video, views| {
        prompt.say(&video_heading(index, total, video));
        prompt.say(&views_line(views));
    })
    .await;

    prompt.say("📊 Results");
    prompt.say(&tally.to_string());

    Ok(())
}

/// One run over the video file.
pub async fn update(config: &Config, client: &reqwest::Client) -> Result<(), ApplicationError> {
    let spreadsheet_id = config.spreadsheet_id()?;

    let mut file = VideoFile::new(&config.videos_file);
    let videos = file.videos().await.context(LoadVideosSnafu)?;
    if file.created() {
        println!("📝 Created {}", file.path().display());
        println!("📝 Add the video URLs to track to it, then run this again");
        return Ok(());
    }
    ensure!(!videos.is_empty(), NoVideosSnafu);

    let sheet = authorize(config, client, spreadsheet_id).await?;

    println!("🕐 Starting update - {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    println!("📊 Videos to update: {}", videos.len());

    let mut tracker = Tracker::new(YouTube::new(client.clone()), sheet).with_progress();
    tracker.set_videos(videos);
    let outcome = tracker.update_now().await.context(UpdateSheetSnafu)?;

    println!("{outcome}");
    println!("✅ Update complete");
    Ok(())
}

pub async fn track<P: Prompt>(
    config: &Config, client: &reqwest::Client, prompt: &mut P,
) -> Result<(), ApplicationError> {
    let spreadsheet_id = config.spreadsheet_id()?;
    let sheet = authorize(config, client, spreadsheet_id).await?;

    prompt.say("Add the videos to track:");
    let videos = ManualEntry::with_titles(prompt)
        .videos()
        .await
        .context(LoadVideosSnafu)?;
    ensure!(!videos.is_empty(), NoVideosSnafu);

    let mut tracker = Tracker::new(YouTube::new(client.clone()), sheet).with_progress();
    tracker.set_videos(videos);

    let trigger = config.trigger();
    prompt.say("1. Update once now");
    prompt.say(&format!(
        "2. Update now and every {} at {}",
        trigger.weekday,
        trigger.at.format("%H:%M")
    ));

    match prompt.ask("Choose (1 or 2): ").as_deref().map(str::trim) {
        Some("1") => {
            let outcome = tracker.update_now().await.context(UpdateSheetSnafu)?;
            prompt.say(&outcome.to_string());
        }
        Some("2") => {
            prompt.say("🚀 Tracking started, press Ctrl+C to stop");
            tracker.run_scheduled(trigger, config.poll_interval).await;
        }
        _ => prompt.say("❌ Invalid choice"),
    }

    Ok(())
}

/// Runs the consent flow if needed, so later requests never prompt.
async fn authorize(
    config: &Config, client: &reqwest::Client, spreadsheet_id: &str,
) -> Result<GoogleSheets, ApplicationError> {
    let secrets = ClientSecrets::load(&config.credentials_file)
        .await
        .context(AuthorizeSnafu)?;
    let authenticator = Authenticator::new(client.clone(), secrets, config.token_file.clone());
    authenticator.access_token().await.context(AuthorizeSnafu)?;

    println!("✅ Connected to Google Sheets");
    Ok(GoogleSheets::authorized(client.clone(), spreadsheet_id, authenticator))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;
    use crate::prompt::Script;

    #[test]
    fn command_line() {
        Cli::command().debug_assert();

        let cli = Cli::parse_from(["viewtrack", "analyze", "--channel", "https://www.youtube.com/@someone"]);
        assert!(matches!(
            cli.command,
            Command::Analyze { channel: Some(ref url) } if url == "https://www.youtube.com/@someone"
        ));
    }

    #[tokio::test]
    async fn lookup_rejects_other_urls_until_quit() {
        let mut script = Script::new(["https://example.com/video", "QUIT", "never asked"]);
        lookup(&YouTube::default(), &mut script).await;

        assert_eq!(script.said, vec![INVALID_VIDEO_URL]);
        assert_eq!(script.asked.len(), 2);
    }

    #[tokio::test]
    async fn analyze_invalid_choice() {
        let mut script = Script::new(["3"]);
        analyze(&YouTube::default(), &mut script, None).await.unwrap();

        assert!(script.transcript().ends_with("❌ Invalid choice"));
    }

    #[tokio::test]
    async fn analyze_blank_channel_url() {
        let mut script = Script::new(["1", "  "]);
        analyze(&YouTube::default(), &mut script, None).await.unwrap();

        assert!(script.transcript().ends_with("❌ Please enter a valid channel URL"));
    }

    #[tokio::test]
    async fn analyze_without_any_video() {
        let mut script = Script::new(["2", "not a url", "done"]);
        analyze(&YouTube::default(), &mut script, None).await.unwrap();

        assert_eq!(
            script.said[2..],
            [INVALID_VIDEO_URL, "❌ No valid video URLs were entered"]
        );
    }
}
