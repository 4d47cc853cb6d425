//! Help index built from the command tree and the parser of command docs
//!
//! Command docs use numpy-like sections:
//!
//! ```text
//! Parameters
//! ----------
//! name : str
//!     What the parameter does
//! ```

use crate::states::Command;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;

/// Category of commands which did not declare one
pub(crate) const DEFAULT_CATEGORY: &str = "Other";

/// Sections whose entries are `name : type` lines followed by an indented description
const ITEM_SECTIONS: [&str; 4] = ["Parameters", "Raises", "Returns", "See Also"];

/// Languages the docs can be rendered in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DocLanguage {
	/// Japanese
	Japanese,
	/// English
	English,
}

impl DocLanguage {
	/// Pick the language of a Discord or HTTP locale
	#[must_use]
	pub(crate) fn from_locale(locale: &str) -> Self {
		if locale.starts_with("ja") {
			Self::Japanese
		} else {
			Self::English
		}
	}

	/// Localised name of a section
	fn heading<'a>(self, section: &'a str) -> &'a str {
		match (self, section) {
			(Self::Japanese, "Parameters") => "コマンドの引数",
			(Self::Japanese, "Notes") => "メモ",
			(Self::Japanese, "Warnings") => "警告",
			(Self::Japanese, "Examples") => "コマンドの使用例",
			(Self::Japanese, "Raises") => "起こり得るエラー",
			(Self::Japanese, "Returns") => "実行結果",
			(Self::Japanese, "See Also") => "関連事項",
			(Self::Japanese, "Aliases") => "エイリアス",
			(Self::English, "Parameters") => "Arguments",
			(Self::English, "Examples") => "Usage examples",
			(Self::English, "Raises") => "Possible errors",
			(Self::English, "Returns") => "Result",
			(_, section) => section,
		}
	}

	/// Localised type names and qualifiers of a `name : type` line
	fn type_names(self) -> &'static [(&'static str, &'static str)] {
		match self {
			Self::Japanese => &[
				("str", "文字列"),
				("int", "整数"),
				("float", "小数"),
				("bool", "真偽値"),
				("role", "ロール"),
				("user", "ユーザー"),
				("channel", "チャンネル"),
				(", optional", ", オプション"),
				(", default", ", デフォルト"),
			],
			Self::English => &[
				("str", "text"),
				("int", "integer"),
				("float", "decimal"),
				("bool", "yes / no"),
			],
		}
	}

	/// Translate the words of a type declaration
	fn translate_type(self, declaration: &str) -> String {
		let mut out = String::with_capacity(declaration.len());

		for (index, part) in declaration.split(", ").enumerate() {
			if index != 0 {
				out.push_str(", ");
			}

			let (word, rest) = part.split_once(' ').map_or((part, None), |(w, r)| (w, Some(r)));
			let qualifier = format!(", {word}");
			let translated = self
				.type_names()
				.iter()
				.find(|(from, _)| *from == word || (index != 0 && *from == qualifier))
				.map_or(word, |(_, to)| to.trim_start_matches(", "));

			out.push_str(translated);
			if let Some(rest) = rest {
				out.push(' ');
				out.push_str(rest);
			}
		}

		out
	}
}

/// Whether a line underlines a section name
fn is_underline(line: &str) -> bool {
	!line.is_empty() && line.chars().all(|char| char == '-')
}

/// Render a `name : type` line
fn render_item(line: &str, language: DocLanguage) -> String {
	match line.split_once(':') {
		Some((name, declaration)) => format!(
			"**{}** : {}",
			name.trim(),
			language.translate_type(declaration.trim())
		),
		None => format!("**{}**", line.trim()),
	}
}

/// Convert numpy-like docs into Markdown with localised section headings
#[must_use]
pub(crate) fn render_docs(docs: &str, language: DocLanguage) -> String {
	let lines = docs.lines().collect::<Vec<_>>();
	let mut out = Vec::with_capacity(lines.len());
	let mut section: Option<&str> = None;

	let mut index = 0;
	while index < lines.len() {
		let line = lines[index].trim_end();

		if lines
			.get(index + 1)
			.is_some_and(|next| is_underline(next.trim()))
			&& !line.trim().is_empty()
		{
			let name = line.trim();
			section = Some(name);
			out.push(format!("### {}", language.heading(name)));
			index += 2;
			continue;
		}

		let rendered = match section {
			Some(name) if ITEM_SECTIONS.contains(&name) => {
				let indented = line.starts_with(char::is_whitespace);
				let trimmed = line.trim();

				if trimmed.is_empty() {
					String::new()
				} else if !indented && (trimmed.contains(" : ") || !trimmed.contains(' ')) {
					render_item(trimmed, language)
				} else {
					trimmed.to_owned()
				}
			}
			_ => line.trim().to_owned(),
		};
		out.push(rendered);

		index += 1;
	}

	out.join("\n").trim().to_owned()
}

/// A command parameter shown in the help
#[derive(Debug, Clone, Serialize)]
pub(crate) struct HelpParameter {
	/// Parameter name
	pub(crate) name: String,
	/// Short description
	pub(crate) description: Option<String>,
	/// Whether the parameter must be given
	pub(crate) required: bool,
}

/// A command or group shown in the help
#[derive(Debug, Clone, Serialize)]
pub(crate) struct HelpCommand {
	/// Command name
	pub(crate) name: String,
	/// Name including the parent groups
	pub(crate) qualified_name: String,
	/// Short description
	pub(crate) description: Option<String>,
	/// Short description by locale
	pub(crate) description_localizations: HashMap<String, String>,
	/// Raw numpy-like docs
	pub(crate) docs: Option<String>,
	/// Parameters of the command
	pub(crate) parameters: Vec<HelpParameter>,
	/// Subcommands of the group
	pub(crate) subcommands: Vec<HelpCommand>,
}

impl HelpCommand {
	/// Collect a command and its subcommands
	///
	/// Qualified names are built from the tree, the framework only fills them once it is built.
	fn from_command(command: &Command, parent: Option<&str>) -> Self {
		let qualified_name = match parent {
			Some(parent) => format!("{parent} {}", command.name),
			None => command.name.clone(),
		};

		Self {
			name: command.name.clone(),
			description: command.description.clone(),
			description_localizations: command.description_localizations.clone(),
			docs: command.help_text.clone(),
			parameters: command
				.parameters
				.iter()
				.map(|parameter| HelpParameter {
					name: parameter.name.clone(),
					description: parameter.description.clone(),
					required: parameter.required,
				})
				.collect(),
			subcommands: command
				.subcommands
				.iter()
				.filter(|command| !command.hide_in_help)
				.map(|subcommand| Self::from_command(subcommand, Some(&qualified_name)))
				.collect(),
			qualified_name,
		}
	}

	/// The description in the given locale, falling back on the default one
	#[must_use]
	pub(crate) fn description_in(&self, locale: &str) -> Option<&str> {
		self.description_localizations
			.get(locale)
			.or(self.description.as_ref())
			.map(String::as_str)
	}

	/// The rendered docs in the given language
	#[must_use]
	pub(crate) fn render_docs(&self, language: DocLanguage) -> Option<String> {
		self.docs.as_deref().map(|docs| render_docs(docs, language))
	}

	/// Usage line, `<required>` and `[optional]` parameters
	#[must_use]
	pub(crate) fn usage(&self) -> String {
		let parameters = self
			.parameters
			.iter()
			.map(|parameter| {
				if parameter.required {
					format!(" <{}>", parameter.name)
				} else {
					format!(" [{}]", parameter.name)
				}
			})
			.collect::<String>();

		format!("/{}{parameters}", self.qualified_name)
	}
}

/// Every visible command, by category
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub(crate) struct HelpIndex {
	/// Categories in registration order
	categories: IndexMap<String, Vec<HelpCommand>>,
}

impl HelpIndex {
	/// Build the index from the registered commands
	#[must_use]
	pub(crate) fn from_commands(commands: &[Command]) -> Self {
		let mut categories: IndexMap<String, Vec<HelpCommand>> = IndexMap::new();

		for command in commands {
			if command.hide_in_help || command.owners_only {
				continue;
			}

			categories
				.entry(
					command
						.category
						.clone()
						.unwrap_or_else(|| DEFAULT_CATEGORY.to_owned()),
				)
				.or_default()
				.push(HelpCommand::from_command(command, None));
		}

		Self { categories }
	}

	/// Categories and their commands
	pub(crate) fn categories(&self) -> impl Iterator<Item = (&str, &[HelpCommand])> {
		self.categories
			.iter()
			.map(|(name, commands)| (name.as_str(), commands.as_slice()))
	}

	/// Commands of a category
	#[must_use]
	pub(crate) fn category(&self, name: &str) -> Option<&[HelpCommand]> {
		self.categories.get(name).map(Vec::as_slice)
	}

	/// Find a command by its qualified name
	#[must_use]
	pub(crate) fn find(&self, qualified_name: &str) -> Option<&HelpCommand> {
		fn find_in<'a>(commands: &'a [HelpCommand], name: &str) -> Option<&'a HelpCommand> {
			commands.iter().find_map(|command| {
				if command.qualified_name == name {
					Some(command)
				} else {
					find_in(&command.subcommands, name)
				}
			})
		}

		let qualified_name = qualified_name.trim().trim_start_matches('/');
		self.categories
			.values()
			.find_map(|commands| find_in(commands, qualified_name))
	}

	/// Qualified names of every command and group
	#[must_use]
	pub(crate) fn qualified_names(&self) -> Vec<&str> {
		fn collect<'a>(commands: &'a [HelpCommand], names: &mut Vec<&'a str>) {
			for command in commands {
				names.push(&command.qualified_name);
				collect(&command.subcommands, names);
			}
		}

		let mut names = Vec::new();
		for commands in self.categories.values() {
			collect(commands, &mut names);
		}

		names
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const DOCS: &str = "Parameters
----------
x : int
    Width of the board
name : str, optional
    The name

Notes
-----
Some notes.";

	#[test]
	fn sections_become_headings() {
		assert_eq!(
			render_docs(DOCS, DocLanguage::English),
			"### Arguments\n**x** : integer\nWidth of the board\n**name** : text, optional\nThe name\n\n### Notes\nSome notes."
		);
	}

	#[test]
	fn japanese_docs_translate_types() {
		let rendered = render_docs(DOCS, DocLanguage::Japanese);

		assert!(rendered.starts_with("### コマンドの引数\n**x** : 整数"));
		assert!(rendered.contains("**name** : 文字列, オプション"));
		assert!(rendered.contains("### メモ\nSome notes."));
	}

	#[test]
	fn unindented_docs_still_parse() {
		let docs = "Parameters\n----------\nrole : role\nRole given to verified members";

		assert_eq!(
			render_docs(docs, DocLanguage::English),
			"### Arguments\n**role** : role\nRole given to verified members"
		);
	}

	#[test]
	fn locales_pick_a_language() {
		assert_eq!(DocLanguage::from_locale("ja"), DocLanguage::Japanese);
		assert_eq!(DocLanguage::from_locale("en-US"), DocLanguage::English);
		assert_eq!(DocLanguage::from_locale("fr"), DocLanguage::English);
	}

	fn command(name: &str, category: Option<&str>, subcommands: Vec<Command>) -> Command {
		Command {
			name: name.to_owned(),
			qualified_name: name.to_owned(),
			category: category.map(ToOwned::to_owned),
			description: Some(format!("{name} description")),
			subcommands,
			..Default::default()
		}
	}

	#[test]
	fn index_groups_commands_by_category() {
		let sub = command("sub", None, Vec::new());
		let mut hidden = command("hidden", None, Vec::new());
		hidden.hide_in_help = true;

		let index = HelpIndex::from_commands(&[
			command("group", Some("ServerTool"), vec![sub]),
			command("lonely", None, Vec::new()),
			hidden,
		]);

		assert_eq!(
			index.categories().map(|(name, _)| name).collect::<Vec<_>>(),
			vec!["ServerTool", DEFAULT_CATEGORY]
		);
		assert_eq!(index.qualified_names(), vec!["group", "group sub", "lonely"]);
		assert_eq!(
			index.find("/group sub").and_then(|c| c.description.as_deref()),
			Some("sub description")
		);
		assert!(index.find("hidden").is_none());
		assert_eq!(index.category("ServerTool").map(<[_]>::len), Some(1));
	}

	#[test]
	fn subcommands_are_named_after_their_groups() {
		let index = HelpIndex::from_commands(&[crate::commands::delay::delayrole()]);

		assert_eq!(
			index.qualified_names(),
			vec!["delayrole", "delayrole set", "delayrole delete", "delayrole list"]
		);
		assert_eq!(
			index.find("delayrole set").map(HelpCommand::usage).as_deref(),
			Some("/delayrole set <delay> <role>")
		);
		assert!(index.find("set").is_none());
	}
}
