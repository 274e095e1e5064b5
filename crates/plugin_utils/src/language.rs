//! Localized messages and chat formatting.
//!
//! Message bundles are TOML files named `{bundle}_{locale}.toml` (falling
//! back to `{bundle}.toml`). Nested tables flatten into dotted keys, and `&`
//! color codes in values are translated to the chat control character.
//!
//! ```toml
//! [shop]
//! opened = "&aShop opened for {0}."
//! ```

use crate::error::UtilsError;
use crate::host::{Player, Scheduler};
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::path::Path;
use std::sync::Arc;
use toml::{Table, Value};
use tracing::debug;

/// Control character that starts a chat formatting code.
pub const COLOR_CHAR: char = '\u{00A7}';

/// Characters accepted after [`COLOR_CHAR`].
const COLOR_CODES: &str = "0123456789AaBbCcDdEeFfKkLlMmNnOoRr";

/// Chat colors and formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatColor {
    Black,
    DarkBlue,
    DarkGreen,
    DarkAqua,
    DarkRed,
    DarkPurple,
    Gold,
    Gray,
    DarkGray,
    Blue,
    Green,
    Aqua,
    Red,
    LightPurple,
    Yellow,
    White,
    Obfuscated,
    Bold,
    Strikethrough,
    Underline,
    Italic,
    Reset,
}

impl ChatColor {
    pub fn code(&self) -> char {
        match self {
            ChatColor::Black => '0',
            ChatColor::DarkBlue => '1',
            ChatColor::DarkGreen => '2',
            ChatColor::DarkAqua => '3',
            ChatColor::DarkRed => '4',
            ChatColor::DarkPurple => '5',
            ChatColor::Gold => '6',
            ChatColor::Gray => '7',
            ChatColor::DarkGray => '8',
            ChatColor::Blue => '9',
            ChatColor::Green => 'a',
            ChatColor::Aqua => 'b',
            ChatColor::Red => 'c',
            ChatColor::LightPurple => 'd',
            ChatColor::Yellow => 'e',
            ChatColor::White => 'f',
            ChatColor::Obfuscated => 'k',
            ChatColor::Bold => 'l',
            ChatColor::Strikethrough => 'm',
            ChatColor::Underline => 'n',
            ChatColor::Italic => 'o',
            ChatColor::Reset => 'r',
        }
    }
}

impl Display for ChatColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", COLOR_CHAR, self.code())
    }
}

/// Replaces `alt_char` followed by a valid code with the chat control
/// character. Codes are lower-cased; anything else is left untouched.
pub fn translate_color_codes(alt_char: char, text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match chars.peek() {
            Some(&next) if c == alt_char && COLOR_CODES.contains(next) => {
                out.push(COLOR_CHAR);
                out.push(next.to_ascii_lowercase());
                chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}

/// Fills `{0}`, `{1}`, ... placeholders with `args`. Placeholders without a
/// matching argument are kept.
pub fn format_message(pattern: &str, args: &[&dyn Display]) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let index: usize = after[..close].trim().parse().ok()?;
            let arg = args.get(index)?;
            Some((arg.to_string(), close))
        });

        match replaced {
            Some((value, close)) => {
                out.push_str(&value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Anything that maps message keys to text.
pub trait MessageProvider: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

impl MessageProvider for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// A language a bundle is loaded for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    /// Locale tag, e.g. `en_US`
    pub locale: String,
    /// Bundle base name, e.g. `messages`
    pub bundle: String,
}

impl Language {
    pub fn new(locale: impl Into<String>, bundle: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            bundle: bundle.into(),
        }
    }

    /// File name of the locale-specific bundle.
    pub fn file_name(&self) -> String {
        format!("{}_{}.toml", self.bundle, self.locale)
    }

    /// File name of the locale-independent fallback bundle.
    pub fn fallback_file_name(&self) -> String {
        format!("{}.toml", self.bundle)
    }
}

/// Message bundle loaded from disk.
#[derive(Debug, Clone)]
pub struct I18n {
    language: Language,
    messages: HashMap<String, String>,
}

impl I18n {
    /// Loads the bundle for `language` from `directory`.
    pub fn load(directory: impl AsRef<Path>, language: Language) -> Result<Self, UtilsError> {
        let directory = directory.as_ref();
        let specific = directory.join(language.file_name());
        let path = if specific.exists() {
            specific
        } else {
            directory.join(language.fallback_file_name())
        };

        let content = std::fs::read_to_string(&path).map_err(|e| UtilsError::io(&path, e))?;
        let table: Table = toml::from_str(&content).map_err(|source| UtilsError::TomlRead {
            path: path.clone(),
            source,
        })?;

        let mut messages = HashMap::new();
        flatten_into(&mut messages, "", &table);
        debug!("Loaded {} messages from {}", messages.len(), path.display());

        Ok(Self { language, messages })
    }

    /// Bundle built from an in-memory map.
    pub fn from_messages(language: Language, messages: HashMap<String, String>) -> Self {
        Self { language, messages }
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    /// Looks up `key` and fills its placeholders.
    pub fn get_and_format(&self, key: &str, args: &[&dyn Display]) -> Result<String, UtilsError> {
        let pattern = self
            .get(key)
            .ok_or_else(|| UtilsError::MissingMessage(key.to_string()))?;
        Ok(format_message(&pattern, args))
    }
}

impl MessageProvider for I18n {
    fn get(&self, key: &str) -> Option<String> {
        self.messages
            .get(key)
            .map(|raw| translate_color_codes('&', raw))
    }
}

fn flatten_into(messages: &mut HashMap<String, String>, prefix: &str, table: &Table) {
    for (key, value) in table {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            Value::String(s) => {
                messages.insert(full_key, s.clone());
            }
            Value::Table(inner) => flatten_into(messages, &full_key, inner),
            other => {
                messages.insert(full_key, other.to_string());
            }
        }
    }
}

/// Formats and delivers plugin messages.
pub struct LanguageManager {
    plugin_prefix: String,
    provider: Arc<dyn MessageProvider>,
    scheduler: Arc<dyn Scheduler>,
}

impl LanguageManager {
    /// `scheduler` is used to deliver messages from off the main context.
    pub fn new(
        provider: Arc<dyn MessageProvider>,
        plugin_prefix: impl Into<String>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            plugin_prefix: plugin_prefix.into(),
            provider,
            scheduler,
        }
    }

    pub fn provider(&self) -> &Arc<dyn MessageProvider> {
        &self.provider
    }

    pub fn plugin_prefix(&self) -> &str {
        &self.plugin_prefix
    }

    /// Text for `key`, or a visible error line when the key is missing.
    pub fn message(&self, key: &str) -> String {
        self.provider.get(key).unwrap_or_else(|| {
            format!(
                "Something is wrong with this plugin. Tell an administrator. ERROR: Key pair \"{}\" could not be found.",
                key
            )
        })
    }

    /// Text for `key` with each `(needle, value)` pair substituted.
    pub fn message_and_replace(&self, key: &str, replacements: &[(&str, &dyn Display)]) -> String {
        replacements
            .iter()
            .fold(self.message(key), |msg, (needle, value)| {
                msg.replace(needle, &value.to_string())
            })
    }

    /// `[prefix] message`, starting with `start_color` (reset when `None`).
    pub fn beautify(start_color: Option<ChatColor>, message: &str, plugin_prefix: &str) -> String {
        format!(
            "{}[{}] {}",
            start_color.unwrap_or(ChatColor::Reset),
            plugin_prefix,
            message
        )
    }

    pub fn beautified_message(&self, start_color: Option<ChatColor>, message: &str) -> String {
        Self::beautify(start_color, message, &self.plugin_prefix)
    }

    /// Sends a beautified message. Main context only.
    pub fn send_message(&self, player: &dyn Player, start_color: Option<ChatColor>, message: &str) {
        player.send_message(&self.beautified_message(start_color, message));
    }

    /// Looks up `key` and sends it beautified. Main context only.
    pub fn send_key(&self, player: &dyn Player, key: &str) {
        self.send_message(player, None, &self.message(key));
    }

    /// Sends a beautified message on the next main-context tick, for use
    /// from worker tasks.
    pub fn send_sync_message(&self, player: Arc<dyn Player>, start_color: Option<ChatColor>, message: &str) {
        let text = self.beautified_message(start_color, message);
        self.scheduler.run_sync(Box::new(move || {
            player.send_message(&text);
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::TickScheduler;
    use crate::types::PlayerId;
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct Recorder {
        id: PlayerId,
        inbox: Mutex<Vec<String>>,
    }

    impl Player for Recorder {
        fn id(&self) -> PlayerId {
            self.id
        }
        fn name(&self) -> &str {
            "recorder"
        }
        fn has_permission(&self, _permission: &str) -> bool {
            true
        }
        fn send_message(&self, message: &str) {
            self.inbox.lock().unwrap().push(message.to_string());
        }
    }

    fn manager(messages: &[(&str, &str)], scheduler: Arc<TickScheduler>) -> LanguageManager {
        let map: HashMap<String, String> = messages
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LanguageManager::new(Arc::new(map), "Shops", scheduler)
    }

    #[test]
    fn test_translate_color_codes() {
        assert_eq!(translate_color_codes('&', "&aHi &Lthere"), "\u{a7}aHi \u{a7}lthere");
        assert_eq!(translate_color_codes('&', "Tom & Jerry &z"), "Tom & Jerry &z");
    }

    #[test]
    fn test_format_message_placeholders() {
        let args: [&dyn Display; 2] = [&"Alex", &3];
        assert_eq!(
            format_message("{0} bought {1} items", &args),
            "Alex bought 3 items"
        );
        assert_eq!(format_message("{5} and {x}", &args), "{5} and {x}");
    }

    #[test]
    fn test_beautify_uses_reset_by_default() {
        assert_eq!(
            LanguageManager::beautify(None, "hello", "Shops"),
            "\u{a7}r[Shops] hello"
        );
        assert_eq!(
            LanguageManager::beautify(Some(ChatColor::Red), "bad", "Shops"),
            "\u{a7}c[Shops] bad"
        );
    }

    #[tokio::test]
    async fn test_missing_key_fallback_and_replace() {
        let scheduler = Arc::new(TickScheduler::try_current().unwrap());
        let manager = manager(&[("greet", "Hello %player%!")], scheduler);

        assert_eq!(
            manager.message_and_replace("greet", &[("%player%", &"Sam")]),
            "Hello Sam!"
        );
        assert!(manager.message("nope").contains("Key pair \"nope\" could not be found"));
    }

    #[tokio::test]
    async fn test_send_sync_message_waits_for_tick() {
        let scheduler = Arc::new(TickScheduler::try_current().unwrap());
        let manager = manager(&[], scheduler.clone());
        let player = Arc::new(Recorder {
            id: PlayerId::new(),
            inbox: Mutex::new(Vec::new()),
        });

        manager.send_sync_message(player.clone(), None, "later");
        assert!(player.inbox.lock().unwrap().is_empty());

        scheduler.tick();
        assert_eq!(*player.inbox.lock().unwrap(), vec!["\u{a7}r[Shops] later".to_string()]);
    }

    #[test]
    fn test_i18n_loads_locale_then_fallback() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("messages.toml"),
            "[shop]\nopened = \"&aShop opened for {0}.\"\n",
        )
        .unwrap();

        let bundle = I18n::load(dir.path(), Language::new("de_DE", "messages")).unwrap();

        assert_eq!(bundle.get("shop.opened").unwrap(), "\u{a7}aShop opened for {0}.");
        assert_eq!(
            bundle.get_and_format("shop.opened", &[&"Kim"]).unwrap(),
            "\u{a7}aShop opened for Kim."
        );
        assert!(matches!(
            bundle.get_and_format("shop.closed", &[]),
            Err(UtilsError::MissingMessage(_))
        ));
    }

    #[test]
    fn test_i18n_missing_bundle_is_io_error() {
        let dir = tempdir().unwrap();
        let result = I18n::load(dir.path(), Language::new("en_US", "messages"));
        assert!(matches!(result, Err(UtilsError::Io { .. })));
    }
}
