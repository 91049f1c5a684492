#![deny(
    missing_docs,
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications
)]

//! po is a command line application based on Pushover API.
//!
//! If Pushover API token / key is "token" and user key is "user",
//!
//! ```
//! $ po -t token -u user -m message
//! ```
//!
//! Or you can set environment variables instead,
//!
//! ```
//! $ export PUSHOVER_TOKEN=token
//! $ export PUSHOVER_USER=user
//! $ po -m message
//! ```
//!
//! Pipe an image to attach it,
//!
//! ```
//! $ po -m "new chart" < chart.png
//! ```
//!
//! For more information,
//!
//! ```
//! $ po -h
//! ```

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context as _};
use clap::Parser;
use log::{debug, Level};
use logging_timer::{finish, stimer};

use pushover::{Attachment, Client, Message, Monospace, Options, Priority, HTML};

#[doc(hidden)]
#[derive(Parser)]
#[clap(about, author, version)]
struct Opts {
    /// Your application's API token. <https://pushover.net/api#identifiers>
    #[clap(short, long, env = "PUSHOVER_TOKEN")]
    token: String,
    /// The user / group key (not e-mail address) of your user (or you). <https://pushover.net/api#identifiers>
    #[clap(short, long, env = "PUSHOVER_USER")]
    user: String,
    /// Your message. <https://pushover.net/api#messages>
    #[clap(short, long, required_unless_present = "list_sounds")]
    message: Option<String>,
    /// Verbose.
    #[clap(short, long)]
    verbose: bool,
    /// Log request bodies, credentials redacted. Shown with RUST_LOG=debug.
    #[clap(long)]
    debug: bool,
    /// Forward requests through this HTTP(S) proxy e.g. http://127.0.0.1:3128
    #[clap(long, env = "PUSHOVER_PROXY")]
    proxy: Option<String>,
    /// Fetch the sound list from Pushover, print it and exit.
    #[clap(long)]
    list_sounds: bool,
    /// To enable HTML formatting. monospace may not be used if html is used, and vice versa. <https://pushover.net/api#html>
    #[clap(long)]
    html: bool,
    /// To enable monospace messages. monospace may not be used if html is used, and vice versa. <https://pushover.net/api#html>
    #[clap(long)]
    monospace: bool,
    /// Your user's device name to send the message directly to that device, rather than all of the user's devices. <https://pushover.net/api#identifiers>
    #[clap(long)]
    device: Option<String>,
    /// Your message's title, otherwise your app's name is used. <https://pushover.net/api#messages>
    #[clap(long)]
    title: Option<String>,
    /// A Unix timestamp of your message's date and time to display to the user, rather than the time your message is received by our API. <https://pushover.net/api#timestamp>
    #[clap(long)]
    timestamp: Option<u64>,
    /// Seconds until the message is deleted from the user's devices. <https://pushover.net/api#ttl>
    #[clap(long)]
    ttl: Option<u64>,
    /// Attach file as notification attachment.
    #[clap(short, long)]
    file: Option<PathBuf>,
    /// Messages may be sent with a different priority that affects how the message is presented to the user
    /// e.g. -2, -1, 0, 1, 2, lowest, low, normal, high, emergency. <https://pushover.net/api#priority>
    #[clap(long, allow_hyphen_values = true)]
    priority: Option<String>,
    /// Seconds between retries of an emergency message. <https://pushover.net/api#priority>
    #[clap(long)]
    retry: Option<u64>,
    /// Seconds until an emergency message stops being retried. <https://pushover.net/api#priority>
    #[clap(long)]
    expire: Option<u64>,
    /// Users can choose from a number of different default sounds to play when receiving notifications. <https://pushover.net/api#sounds>
    #[clap(long)]
    sound: Option<String>,
    /// A supplementary URL to show with your message. <https://pushover.net/api#urls>
    #[clap(long)]
    url: Option<String>,
    /// A title for your supplementary URL, otherwise just the URL is shown. <https://pushover.net/api#urls>
    #[clap(long)]
    url_title: Option<String>,
}

impl Opts {
    fn options(&self) -> Options {
        let mut options = Options::new(self.token.as_str(), self.user.as_str());
        options.debug = self.debug;
        options.http.proxy = self.proxy.clone();
        options
    }

    fn message(&self) -> anyhow::Result<Message> {
        let mut message = Message::new(self.message.clone().unwrap_or_default());
        message.device = self.device.clone();
        message.title = self.title.clone();
        message.timestamp = self.timestamp;
        message.ttl = self.ttl;
        message.retry = self.retry;
        message.expire = self.expire;
        message.priority = match self.priority {
            Some(ref p) => Some(Priority::from_str(p).with_context(|| format!("priority {p}"))?),
            None => None,
        };
        message.sound = self.sound.clone();
        message.url = self.url.clone();
        message.url_title = self.url_title.clone();
        message.html = self.html.then(|| HTML::HTML);
        message.monospace = self.monospace.then(|| Monospace::Monospace);
        message.file = self.file.clone().map(Into::into);
        Ok(message)
    }
}

#[doc(hidden)]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use std::io::Read as _;

    pretty_env_logger::init();

    let opts: Opts = Opts::parse();
    let client = Client::new(opts.options())?;

    if opts.list_sounds {
        let tmr = stimer!(Level::Debug; "SOUNDS");
        client.refresh_sounds().await?;
        finish!(tmr);
        for (name, label) in client.sounds().iter() {
            println!("{name}\t{label}");
        }
        return Ok(());
    }

    let mut message = opts.message()?;
    if let Some(ref sound) = message.sound {
        if !client.sound_table().contains(sound) {
            bail!("unknown sound {sound}, see --list-sounds");
        }
    }

    if message.file.is_none() && atty::isnt(atty::Stream::Stdin) {
        debug!("load attachment from standard input");
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        if !buf.is_empty() {
            message.file = Some(Attachment::try_from(buf)?.into());
        }
    }

    let tmr = stimer!(Level::Debug; "NOTIFY");
    let delivery = client.send(&message).await?;
    finish!(tmr);

    match delivery.response {
        Some(ref res) if res.status == 1 => {
            if opts.verbose {
                println!("{res:?}");
            }
            Ok(())
        }
        _ => bail!(format!("{delivery:?}")),
    }
}
