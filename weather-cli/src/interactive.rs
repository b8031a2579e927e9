use inquire::{InquireError, Text};
use weather_core::{Preferences, Screen};

use crate::render;

const HELP: &str = "\
Type a city name to search, or one of:
  :unit        switch metric/imperial
  :fav         add/remove the shown city from favorites
  :refresh     reload the shown city
  :retry       repeat the request that failed
  :locate      weather for the current location
  :favorites   list favorites
  :open <n>    show favorite number n
  :help        this text
  :quit        exit";

#[derive(Debug, PartialEq)]
enum Input<'a> {
    Search(&'a str),
    Unit,
    Favorite,
    Refresh,
    Retry,
    Locate,
    Favorites,
    Open(usize),
    Help,
    Quit,
    Unknown(&'a str),
}

fn parse(line: &str) -> Input<'_> {
    let line = line.trim();
    let Some(cmd) = line.strip_prefix(':') else {
        return Input::Search(line);
    };

    let mut parts = cmd.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("unit" | "u"), None) => Input::Unit,
        (Some("fav" | "f"), None) => Input::Favorite,
        (Some("refresh" | "r"), None) => Input::Refresh,
        (Some("retry"), None) => Input::Retry,
        (Some("locate" | "l"), None) => Input::Locate,
        (Some("favorites" | "favs"), None) => Input::Favorites,
        (Some("open" | "o"), Some(n)) => match n.parse() {
            Ok(n) if n > 0 => Input::Open(n),
            _ => Input::Unknown(line),
        },
        (Some("help" | "h" | "?"), None) => Input::Help,
        (Some("quit" | "q" | "exit"), None) => Input::Quit,
        _ => Input::Unknown(line),
    }
}

/// Drive the screen from a prompt until the user quits.
pub async fn run<P: Preferences>(mut screen: Screen<P>) -> anyhow::Result<()> {
    println!("{HELP}\n");

    screen.start();
    screen.settle().await;
    show(&mut screen);

    loop {
        let prompt = format!("[{}] >", screen.unit());
        let line = match Text::new(&prompt).prompt() {
            Ok(line) => line,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(err) => return Err(err.into()),
        };

        match parse(&line) {
            Input::Search(city) => {
                if !screen.search(city) {
                    continue;
                }
            }
            Input::Unit => {
                let unit = screen.toggle_unit();
                println!("Units: {unit}");
            }
            Input::Favorite => {
                if screen.toggle_favorite().is_none() {
                    println!("Nothing to add: no weather is shown.");
                }
            }
            Input::Refresh => {
                if !screen.refresh() {
                    println!("Nothing to refresh.");
                }
            }
            Input::Retry => {
                if !screen.retry() {
                    println!("Nothing to retry.");
                    continue;
                }
                if let Some(query) = screen.last_attempt() {
                    println!("Retrying {query}...");
                }
            }
            Input::Locate => screen.locate(),
            Input::Favorites => {
                print!("{}", render::favorites(screen.favorites()));
                continue;
            }
            Input::Open(n) => match screen.favorites().get(n - 1).cloned() {
                Some(city) => screen.select_favorite(&city),
                None => {
                    println!("No favorite number {n}.");
                    continue;
                }
            },
            Input::Help => {
                println!("{HELP}");
                continue;
            }
            Input::Quit => break,
            Input::Unknown(cmd) => {
                println!("Unknown command {cmd}. Type :help for the list.");
                continue;
            }
        }

        screen.settle().await;
        show(&mut screen);
    }

    Ok(())
}

fn show<P: Preferences>(screen: &mut Screen<P>) {
    for notice in screen.take_notices() {
        println!("{}", render::notice(&notice));
    }
    print!("{}", render::screen(&screen.view()));
}
