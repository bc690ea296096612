//! Tip command parsing.
//!
//! Turns post text such as `great take !montip tip 10 $mon` into a
//! `TipCommand`. Parsing is pure: no I/O, no side effects.

use crate::registry::TokenRegistry;
use std::str::FromStr;
use std::sync::Arc;
use tip_types::{Decimal, TipCommand, TriggerPolicy};

/// Extracts `(amount, symbol)` after the configured trigger word.
#[derive(Debug, Clone)]
pub struct CommandParser {
	trigger: String,
	connector: String,
	policy: TriggerPolicy,
	registry: Arc<TokenRegistry>,
}

impl CommandParser {
	pub fn new(
		trigger: &str,
		connector: &str,
		policy: TriggerPolicy,
		registry: Arc<TokenRegistry>,
	) -> Self {
		Self {
			trigger: trigger.to_lowercase(),
			connector: connector.to_lowercase(),
			policy,
			registry,
		}
	}

	/// True when the trigger word appears where the policy allows it.
	///
	/// Used to tell posts that are not meant for the bot apart from
	/// malformed commands.
	pub fn has_trigger(&self, text: &str) -> bool {
		let words = tokenize(text);
		self.command_start(&words).is_some()
	}

	/// Parses a tip command, or returns `None` if the text holds no valid one.
	pub fn parse(&self, text: &str) -> Option<TipCommand> {
		let words = tokenize(text);
		let start = self.command_start(&words)?;

		let amount = parse_amount(words.get(start)?)?;
		let raw_symbol = words.get(start + 1)?.trim_start_matches('$');
		let token_symbol = self.registry.canonical_symbol(raw_symbol)?.to_string();

		Some(TipCommand {
			amount,
			token_symbol,
		})
	}

	/// Index of the first word after the trigger (and connector, if present).
	fn command_start(&self, words: &[String]) -> Option<usize> {
		match self.policy {
			TriggerPolicy::Anywhere => {
				let at = words.iter().position(|w| *w == self.trigger)?;
				if words.get(at + 1).is_some_and(|w| *w == self.connector) {
					Some(at + 2)
				} else {
					Some(at + 1)
				}
			},
			TriggerPolicy::FirstWord => {
				if words.first()? == &self.trigger && words.get(1)? == &self.connector {
					Some(2)
				} else {
					None
				}
			},
		}
	}
}

fn tokenize(text: &str) -> Vec<String> {
	text.to_lowercase()
		.split_whitespace()
		.map(str::to_string)
		.collect()
}

/// Accepts plain positive decimals like `10`, `0.5` or `.25`.
fn parse_amount(raw: &str) -> Option<Decimal> {
	let digits = raw.chars().filter(char::is_ascii_digit).count();
	let dots = raw.chars().filter(|c| *c == '.').count();
	if digits == 0 || dots > 1 || digits + dots != raw.len() {
		return None;
	}

	let amount = if raw.starts_with('.') {
		Decimal::from_str(&format!("0{}", raw)).ok()?
	} else {
		Decimal::from_str(raw).ok()?
	};
	(amount > Decimal::ZERO).then_some(amount)
}

#[cfg(test)]
mod tests {
	use super::*;
	use tip_types::{Address, TokenInfo};

	fn registry() -> Arc<TokenRegistry> {
		let token = |symbol: &str| TokenInfo {
			symbol: symbol.to_string(),
			address: Address::ZERO,
			decimals: 18,
		};
		Arc::new(TokenRegistry::new([token("MON"), token("USDC"), token("gMON")]).unwrap())
	}

	fn parser(policy: TriggerPolicy) -> CommandParser {
		CommandParser::new("!montip", "tip", policy, registry())
	}

	fn dec(s: &str) -> Decimal {
		Decimal::from_str(s).unwrap()
	}

	#[test]
	fn test_full_command() {
		let command = parser(TriggerPolicy::Anywhere)
			.parse("!montip tip 10 mon")
			.unwrap();
		assert_eq!(command.amount, dec("10"));
		assert_eq!(command.token_symbol, "MON");
	}

	#[test]
	fn test_reference_commands() {
		let p = parser(TriggerPolicy::Anywhere);

		let command = p.parse("!montip tip 1.5 usdc").unwrap();
		assert_eq!((command.amount, command.token_symbol.as_str()), (dec("1.5"), "USDC"));

		let command = p.parse("!montip 2 $mon").unwrap();
		assert_eq!((command.amount, command.token_symbol.as_str()), (dec("2"), "MON"));

		assert!(p.parse("hello world").is_none());
		assert!(p.parse("!montip tip abc usdc").is_none());
		assert!(p.parse("!montip tip 5 doge").is_none());
	}

	#[test]
	fn test_parse_is_pure() {
		let p = parser(TriggerPolicy::Anywhere);
		let text = "thanks !montip tip 3.25 $gmon";
		assert_eq!(p.parse(text), p.parse(text));
		assert!(p.parse(text).is_some());
	}

	#[test]
	fn test_anywhere_policy_connector_optional() {
		let p = parser(TriggerPolicy::Anywhere);

		let command = p.parse("loved this! !MonTip 2.5 $usdc thanks").unwrap();
		assert_eq!(command.amount, dec("2.5"));
		assert_eq!(command.token_symbol, "USDC");

		let command = p.parse("gm !montip TIP .25 GMON").unwrap();
		assert_eq!(command.amount, dec("0.25"));
		assert_eq!(command.token_symbol, "gMON");
	}

	#[test]
	fn test_first_word_policy_requires_prefix_and_connector() {
		let p = parser(TriggerPolicy::FirstWord);

		assert!(p.parse("!montip tip 1 mon").is_some());
		assert!(p.parse("!montip 1 mon").is_none());
		assert!(p.parse("nice !montip tip 1 mon").is_none());
		assert!(!p.has_trigger("nice !montip tip 1 mon"));
	}

	#[test]
	fn test_rejects_bad_amounts() {
		let p = parser(TriggerPolicy::Anywhere);
		for text in [
			"!montip tip 0 mon",
			"!montip tip -1 mon",
			"!montip tip nan mon",
			"!montip tip ten mon",
			"!montip tip 1e3 mon",
			"!montip tip 1.2.3 mon",
			"!montip tip . mon",
			"!montip tip",
		] {
			assert!(p.parse(text).is_none(), "{} should not parse", text);
		}
	}

	#[test]
	fn test_rejects_missing_or_unknown_symbol() {
		let p = parser(TriggerPolicy::Anywhere);
		assert!(p.parse("!montip tip 5").is_none());
		assert!(p.parse("!montip tip 5 doge").is_none());
		assert!(p.has_trigger("!montip tip 5 doge"));
	}

	#[test]
	fn test_no_trigger() {
		let p = parser(TriggerPolicy::Anywhere);
		assert!(p.parse("tip 5 mon").is_none());
		assert!(!p.has_trigger("montip tip 5 mon"));
	}

	#[test]
	fn test_custom_trigger_words() {
		let p = CommandParser::new("!Tipbot", "send", TriggerPolicy::FirstWord, registry());
		let command = p.parse("!tipbot send 3 mon").unwrap();
		assert_eq!(command.amount, dec("3"));
	}
}
