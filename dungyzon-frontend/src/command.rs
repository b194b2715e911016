/// Commands understood by the terminal front-end
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/search <term>`, or any line without a command prefix
    Search(String),
    Page(u32),
    Next,
    Prev,
    Retry,
    /// 1-based index into the visible results
    Details(usize),
    Quick(usize),
    Favorite(usize),
    Favorites,
    History,
    Theme,
    Help,
    Quit,
}

impl Command {
    /// Parses one input line.
    ///
    /// ```
    /// use dungyzon_frontend::command::Command;
    ///
    /// assert_eq!(Command::parse("/page 3"), Ok(Command::Page(3)));
    /// assert_eq!(Command::parse("usb hub"), Ok(Command::Search("usb hub".to_string())));
    /// ```
    pub fn parse(line: &str) -> Result<Self, String> {
        let trimmed = line.trim();

        let Some((prefix, rest)) = Self::extract_prefix(trimmed) else {
            return Ok(Command::Search(trimmed.to_string()));
        };
        let arguments = rest.trim();

        match prefix.to_lowercase().as_str() {
            "/s" | "/search" => Ok(Command::Search(arguments.to_string())),
            "/page" => Self::number(arguments).map(|n| Command::Page(n as u32)),
            "/n" | "/next" => Ok(Command::Next),
            "/p" | "/prev" => Ok(Command::Prev),
            "/r" | "/retry" => Ok(Command::Retry),
            "/d" | "/details" => Self::number(arguments).map(Command::Details),
            "/quick" => Self::number(arguments).map(Command::Quick),
            "/f" | "/fav" => Self::number(arguments).map(Command::Favorite),
            "/favs" | "/favorites" => Ok(Command::Favorites),
            "/h" | "/history" => Ok(Command::History),
            "/theme" => Ok(Command::Theme),
            "/help" | "/?" => Ok(Command::Help),
            "/q" | "/quit" | "/exit" => Ok(Command::Quit),
            other => Err(format!("Unknown command: {}", other)),
        }
    }

    fn extract_prefix(text: &str) -> Option<(&str, &str)> {
        if !text.starts_with('/') {
            return None;
        }
        match text.find(char::is_whitespace) {
            Some(space_pos) => Some((&text[..space_pos], &text[space_pos..])),
            None => Some((text, "")),
        }
    }

    fn number(arguments: &str) -> Result<usize, String> {
        match arguments.parse::<usize>() {
            Ok(n) if n >= 1 && n <= u32::MAX as usize => Ok(n),
            _ => Err(format!("Expected a number starting at 1, got '{}'", arguments)),
        }
    }
}

pub const HELP: &str = "\
Commands:
  <term> | /search <term>   search (empty term clears)
  /next, /prev, /page <n>   change page
  /retry                    fetch the current page again
  /details <n>, /quick <n>  product detail for result n
  /fav <n>                  toggle favorite for result n
  /favs, /history           list favorites / recent searches
  /theme                    toggle dark mode
  /quit                     exit";
