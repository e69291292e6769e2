//! Record grammar for the serialized item format
//!
//! ```text
//! File        := Item* end-of-stream
//! Item        := ItemSep NL Properties SharedField* Version*
//! SharedField := FieldSep NL Properties FieldValue
//! Version     := VersionSep NL Properties SharedField*
//! Properties  := (PropertyName Content? NL)* NL
//! FieldValue  := (Content | NL)*
//! ```
//!
//! The grammar runs over the token stream produced by [`Lexer`]. Records are
//! first collected as property maps and only then turned into typed
//! [`Item`], [`Field`] and [`LanguageVersion`] values, so that a missing key
//! is reported with the key name and the record it belongs to.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::{line_column, ItemsError, Result};
use crate::interner::Interner;
use crate::lexer::{Lexer, Token, TokenKind, TokenStream};
use crate::models::{Field, Item, ItemFile, ItemSetId, LanguageVersion};

/// Property keys of an item record
pub mod keys {
    /// Item id
    pub const ID: &str = "id";
    /// Parent item id
    pub const PARENT: &str = "parent";
    /// Content tree path
    pub const PATH: &str = "path";
    /// Template id
    pub const TEMPLATE: &str = "template";
    /// Template name
    pub const TEMPLATE_KEY: &str = "templatekey";
    /// Item name
    pub const NAME: &str = "name";
    /// Field definition id
    pub const FIELD: &str = "field";
    /// Language code
    pub const LANGUAGE: &str = "language";
    /// Version number
    pub const VERSION: &str = "version";
    /// Revision id
    pub const REVISION: &str = "revision";
}

/// Parser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Closed set of recognized property keys
    pub property_names: Vec<String>,
    /// Versioned fields kept after parsing (by name, case-insensitive)
    pub included_fields: Vec<String>,
    /// Field names whose values are interned
    pub interned_fields: Vec<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            property_names: [
                "version",
                "id",
                "database",
                "path",
                "parent",
                "name",
                "master",
                "template",
                "templatekey",
                "created",
                "field",
                "key",
                "content-length",
                "language",
                "revision",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            included_fields: vec!["__Display name".to_string()],
            interned_fields: vec!["Type".to_string(), "__Base template".to_string()],
        }
    }
}

/// Parses serialized item files into [`Item`] records
#[derive(Debug, Clone)]
pub struct ItemParser {
    lexer: Lexer,
    included_fields: HashSet<String>,
    interned_fields: HashSet<String>,
    interner: Arc<Interner>,
}

impl ItemParser {
    /// Create a parser with its own interner
    pub fn new(config: &ParserConfig) -> Result<Self> {
        Self::with_interner(config, Arc::new(Interner::new()))
    }

    /// Create a parser sharing an existing interner
    pub fn with_interner(config: &ParserConfig, interner: Arc<Interner>) -> Result<Self> {
        Ok(Self {
            lexer: Lexer::new(&config.property_names)?,
            included_fields: lowercase_set(&config.included_fields),
            interned_fields: lowercase_set(&config.interned_fields),
            interner,
        })
    }

    /// The interner shared by this parser
    pub fn interner(&self) -> &Arc<Interner> {
        &self.interner
    }

    /// The underlying lexer
    pub fn lexer(&self) -> &Lexer {
        &self.lexer
    }

    /// Read and parse an item file from disk
    pub fn parse_file(&self, file: &ItemFile, set_id: ItemSetId) -> Result<Vec<Item>> {
        let bytes = std::fs::read(&file.path).map_err(|source| ItemsError::Io {
            path: file.path.display().to_string(),
            source,
        })?;
        self.parse_bytes(&bytes, file, set_id)
    }

    /// Parse raw file bytes
    pub fn parse_bytes(&self, bytes: &[u8], file: &ItemFile, set_id: ItemSetId) -> Result<Vec<Item>> {
        let scope = file.path.display().to_string();
        let stream = self.lexer.tokenize_bytes(bytes, &scope)?;
        self.parse_stream(&stream, file, set_id)
    }

    /// Parse a source text
    pub fn parse_str(&self, text: &str, file: &ItemFile, set_id: ItemSetId) -> Result<Vec<Item>> {
        let scope = file.path.display().to_string();
        let stream = self.lexer.tokenize(text, &scope)?;
        self.parse_stream(&stream, file, set_id)
    }

    fn parse_stream(
        &self,
        stream: &TokenStream<'_>,
        file: &ItemFile,
        set_id: ItemSetId,
    ) -> Result<Vec<Item>> {
        let scope = file.path.display().to_string();
        let records = Grammar::new(stream, &scope).file()?;
        trace!(scope = %scope, records = records.len(), "Parsed item records");

        let builder = RecordBuilder {
            parser: self,
            scope: &scope,
            origin: &file.path,
            hints: &file.properties,
            set_id,
        };
        let items = records
            .into_iter()
            .map(|record| builder.item(record))
            .collect::<Result<Vec<_>>>()?;
        debug!(scope = %scope, items = items.len(), "Built items");
        Ok(items)
    }

    fn intern_value(&self, field_name: &str, value: String) -> Arc<str> {
        if self.interned_fields.contains(&field_name.to_lowercase()) {
            self.interner.intern(&value)
        } else {
            Arc::from(value)
        }
    }
}

fn lowercase_set(values: &[String]) -> HashSet<String> {
    values.iter().map(|v| v.to_lowercase()).collect()
}

/// A property block collected from the token stream
type Properties = HashMap<String, String>;

/// A field record before typing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawField {
    /// Property block of the field
    pub properties: Properties,
    /// Raw value, lines joined verbatim
    pub value: String,
}

/// A version record before typing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawVersion {
    /// Property block of the version
    pub properties: Properties,
    /// Versioned fields
    pub fields: Vec<RawField>,
}

/// An item record before typing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItem {
    /// Property block of the item
    pub properties: Properties,
    /// Unversioned fields
    pub shared_fields: Vec<RawField>,
    /// Language versions
    pub versions: Vec<RawVersion>,
}

/// Token-stream combinators implementing the record grammar
struct Grammar<'s, 't> {
    stream: &'s TokenStream<'t>,
    position: usize,
    scope: &'s str,
}

impl<'s, 't> Grammar<'s, 't> {
    fn new(stream: &'s TokenStream<'t>, scope: &'s str) -> Self {
        Self {
            stream,
            position: 0,
            scope,
        }
    }

    /// File := Item* end-of-stream
    fn file(mut self) -> Result<Vec<RawItem>> {
        let items = self.many(Self::item)?;
        match self.peek() {
            None => Ok(items),
            Some(token) => Err(self.unexpected(token, "expected item separator or end of file")),
        }
    }

    /// Item := ItemSep NL Properties SharedField* Version*
    fn item(&mut self) -> Result<Option<RawItem>> {
        if !self.accept(TokenKind::ItemSeparator) {
            return Ok(None);
        }
        self.expect(TokenKind::NewLine, "newline after item separator")?;
        let properties = self.properties()?;
        let shared_fields = self.many(Self::field)?;
        let versions = self.many(Self::version)?;
        Ok(Some(RawItem {
            properties,
            shared_fields,
            versions,
        }))
    }

    /// SharedField := FieldSep NL Properties FieldValue
    fn field(&mut self) -> Result<Option<RawField>> {
        if !self.accept(TokenKind::FieldSeparator) {
            return Ok(None);
        }
        self.expect(TokenKind::NewLine, "newline after field separator")?;
        let properties = self.properties()?;
        let value = self.field_value();
        Ok(Some(RawField { properties, value }))
    }

    /// Version := VersionSep NL Properties SharedField*
    fn version(&mut self) -> Result<Option<RawVersion>> {
        if !self.accept(TokenKind::VersionSeparator) {
            return Ok(None);
        }
        self.expect(TokenKind::NewLine, "newline after version separator")?;
        let properties = self.properties()?;
        let fields = self.many(Self::field)?;
        Ok(Some(RawVersion { properties, fields }))
    }

    /// Properties := (PropertyName Content? NL)* NL
    fn properties(&mut self) -> Result<Properties> {
        let mut properties = Properties::new();
        loop {
            let Some(token) = self.peek() else {
                // A block cut short by the end of the file is still complete.
                return Ok(properties);
            };
            match token.kind {
                TokenKind::NewLine => {
                    self.position += 1;
                    return Ok(properties);
                }
                TokenKind::PropertyName => {
                    self.position += 1;
                    let value = match self.peek() {
                        Some(t) if t.kind == TokenKind::Content => {
                            self.position += 1;
                            t.text.to_string()
                        }
                        _ => String::new(),
                    };
                    if self.peek().is_some() {
                        self.expect(TokenKind::NewLine, "newline after property value")?;
                    }
                    let key = token.property_key().unwrap_or_default();
                    properties.insert(key, value);
                }
                _ => return Err(self.unexpected(token, "expected property name or blank line")),
            }
        }
    }

    /// FieldValue := (Content | NL)*
    ///
    /// Property-looking lines inside a value are kept verbatim.
    fn field_value(&mut self) -> String {
        let start = self.position;
        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::Content | TokenKind::NewLine | TokenKind::PropertyName => {
                    self.position += 1
                }
                _ => break,
            }
        }
        let mut tokens = &self.stream.tokens()[start..self.position];
        if let Some((last, rest)) = tokens.split_last() {
            if last.kind == TokenKind::NewLine {
                tokens = rest;
            }
        }
        tokens.iter().map(|t| t.text).collect()
    }

    fn many<T>(&mut self, rule: fn(&mut Self) -> Result<Option<T>>) -> Result<Vec<T>> {
        let mut values = Vec::new();
        while let Some(value) = rule(self)? {
            values.push(value);
        }
        Ok(values)
    }

    fn peek(&self) -> Option<Token<'t>> {
        self.stream.tokens().get(self.position).copied()
    }

    fn accept(&mut self, kind: TokenKind) -> bool {
        match self.peek() {
            Some(token) if token.kind == kind => {
                self.position += 1;
                true
            }
            _ => false,
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token<'t>> {
        match self.peek() {
            Some(token) if token.kind == kind => {
                self.position += 1;
                Ok(token)
            }
            Some(token) => Err(self.unexpected(token, &format!("expected {}", what))),
            None => {
                let (line, column) = line_column(self.stream.source(), self.stream.source().len());
                Err(ItemsError::Grammar {
                    scope: self.scope.to_string(),
                    line,
                    column,
                    message: format!("unexpected end of file, expected {}", what),
                })
            }
        }
    }

    fn unexpected(&self, token: Token<'_>, message: &str) -> ItemsError {
        let (line, column) = line_column(self.stream.source(), token.offset);
        ItemsError::Grammar {
            scope: self.scope.to_string(),
            line,
            column,
            message: format!("unexpected {} '{}', {}", token.kind.describe(), token.text.trim_end(), message),
        }
    }
}

/// Turns raw records into typed records
struct RecordBuilder<'a> {
    parser: &'a ItemParser,
    scope: &'a str,
    origin: &'a Path,
    hints: &'a HashMap<String, String>,
    set_id: ItemSetId,
}

impl<'a> RecordBuilder<'a> {
    fn item(&self, raw: RawItem) -> Result<Item> {
        let props = &raw.properties;
        let scope = format!("item in {}", self.scope);
        let id = parse_id(props, keys::ID, &scope)?;
        let scope = format!("item {} in {}", id, self.scope);

        let parent_id = parse_id(props, keys::PARENT, &scope)?;
        let path = required(props, keys::PATH, &scope)?.to_string();
        let template_id = parse_id(props, keys::TEMPLATE, &scope)?;
        let template_name = required(props, keys::TEMPLATE_KEY, &scope)?.to_string();
        let name = required(props, keys::NAME, &scope)?.to_string();

        let shared_fields = raw
            .shared_fields
            .into_iter()
            .map(|f| self.field(f, &scope))
            .collect::<Result<Vec<_>>>()?;
        let versions = raw
            .versions
            .into_iter()
            .map(|v| self.version(v, &scope))
            .collect::<Result<Vec<_>>>()?;

        Ok(Item {
            id,
            name,
            parent_id,
            path,
            origin: self.origin.to_path_buf(),
            set_id: self.set_id,
            shared_fields,
            template_id,
            template_name,
            versions,
            hints: self.hints.clone(),
        })
    }

    fn field(&self, raw: RawField, scope: &str) -> Result<Field> {
        let scope = format!("field of {}", scope);
        let id = parse_id(&raw.properties, keys::FIELD, &scope)?;
        let name = required(&raw.properties, keys::NAME, &scope)?;
        let value = self.parser.intern_value(name, raw.value);
        Ok(Field {
            id,
            name: self.parser.interner.intern(name),
            value,
        })
    }

    fn version(&self, raw: RawVersion, scope: &str) -> Result<LanguageVersion> {
        let scope = format!("version of {}", scope);
        let props = &raw.properties;
        let language = required(props, keys::LANGUAGE, &scope)?.to_string();
        let version_text = required(props, keys::VERSION, &scope)?;
        let version = version_text
            .trim()
            .parse::<u32>()
            .map_err(|_| ItemsError::invalid(keys::VERSION, version_text, scope.as_str()))?;
        let revision = parse_id(props, keys::REVISION, &scope)?;

        let mut fields = BTreeMap::new();
        for raw_field in raw.fields {
            let field = self.field(raw_field, &scope)?;
            if !self
                .parser
                .included_fields
                .contains(&field.name.to_lowercase())
            {
                continue;
            }
            fields.entry(field.id).or_insert(field);
        }

        Ok(LanguageVersion {
            language,
            version,
            revision,
            fields,
        })
    }
}

fn required<'p>(props: &'p Properties, key: &str, scope: &str) -> Result<&'p str> {
    props
        .get(key)
        .map(|v| v.as_str())
        .ok_or_else(|| ItemsError::missing(key, scope))
}

fn parse_id(props: &Properties, key: &str, scope: &str) -> Result<Uuid> {
    let value = required(props, key, scope)?;
    Uuid::parse_str(value.trim()).map_err(|_| ItemsError::invalid(key, value, scope))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE_ITEM: &str = "----item----
version: 1
id: {A0000000-0000-0000-0000-000000000001}
database: master
path: /sitecore/templates/Feature/Page
parent: {B0000000-0000-0000-0000-000000000001}
name: Page
master: {00000000-0000-0000-0000-000000000000}
template: {AB86861A-6030-46C5-B394-E8F99E8B87DB}
templatekey: Template

----field----
field: {12C33F3F-86C5-43A5-AEB4-5598CEC45116}
name: __Base template
key: __base template
content-length: 38

{1930BBEB-7805-471A-A3BE-4858AC7CF696}
----version----
language: en
version: 1
revision: {C0000000-0000-0000-0000-000000000001}

----field----
field: {B5E02AD9-D56F-4C41-A065-A133DB87BDEB}
name: __Display name
key: __display name
content-length: 9

Page Type
----field----
field: {25BED78C-4957-4165-998A-CA1B52F67497}
name: __Created
key: __created
content-length: 15

20240101T000000
";

    fn parser() -> ItemParser {
        ItemParser::new(&ParserConfig::default()).unwrap()
    }

    fn file() -> ItemFile {
        ItemFile::new("Page.item").with_property("namespace", "Feature.Pages")
    }

    #[test]
    fn test_parse_template_item() {
        let items = parser().parse_str(TEMPLATE_ITEM, &file(), Uuid::nil()).unwrap();
        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.name, "Page");
        assert_eq!(item.template_name, "Template");
        assert_eq!(item.path, "/sitecore/templates/Feature/Page");
        assert_eq!(item.shared_fields.len(), 1);
        assert_eq!(
            &*item.shared_fields[0].value,
            "{1930BBEB-7805-471A-A3BE-4858AC7CF696}"
        );
        assert_eq!(item.hint("namespace"), Some("Feature.Pages"));
    }

    #[test]
    fn test_version_fields_are_filtered_to_allow_list() {
        let items = parser().parse_str(TEMPLATE_ITEM, &file(), Uuid::nil()).unwrap();
        let version = &items[0].versions[0];
        assert_eq!(version.language, "en");
        assert_eq!(version.version, 1);
        assert_eq!(version.fields.len(), 1);
        assert_eq!(&*version.field_named("__display name").unwrap().value, "Page Type");
    }

    #[test]
    fn test_configured_values_are_interned() {
        let parser = parser();
        let a = parser.parse_str(TEMPLATE_ITEM, &file(), Uuid::nil()).unwrap();
        let b = parser.parse_str(TEMPLATE_ITEM, &file(), Uuid::nil()).unwrap();
        assert!(Arc::ptr_eq(
            &a[0].shared_fields[0].value,
            &b[0].shared_fields[0].value
        ));
        assert!(Arc::ptr_eq(&a[0].shared_fields[0].name, &b[0].shared_fields[0].name));
    }

    #[test]
    fn test_missing_item_key_names_key_and_scope() {
        let text = TEMPLATE_ITEM.replace("templatekey: Template\n", "");
        let err = parser().parse_str(&text, &file(), Uuid::nil()).unwrap_err();
        match err {
            ItemsError::MissingProperty { key, scope } => {
                assert_eq!(key, "templatekey");
                assert!(scope.contains("Page.item"));
                assert!(scope.contains("a0000000-0000-0000-0000-000000000001"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_property_without_value_is_empty_string() {
        let text = TEMPLATE_ITEM.replace("name: Page\n", "name: \n");
        // "name: " matches the key with an empty value
        let items = parser().parse_str(&text, &file(), Uuid::nil()).unwrap();
        assert_eq!(items[0].name, "");
    }

    #[test]
    fn test_invalid_version_number() {
        let text = TEMPLATE_ITEM.replace("version: 1\nrevision", "version: one\nrevision");
        let err = parser().parse_str(&text, &file(), Uuid::nil()).unwrap_err();
        assert!(matches!(err, ItemsError::InvalidProperty { ref key, .. } if key == "version"));
    }

    #[test]
    fn test_grammar_error_has_position() {
        let text = "----item----\nid: {A0000000-0000-0000-0000-000000000001}\nowner: me\n";
        let err = parser().parse_str(text, &file(), Uuid::nil()).unwrap_err();
        match err {
            ItemsError::Grammar { line, column, .. } => {
                assert_eq!(line, 3);
                assert_eq!(column, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_garbage_before_first_item_is_grammar_error() {
        let err = parser().parse_str("hello\n", &file(), Uuid::nil()).unwrap_err();
        assert!(err.is_grammar());
    }

    #[test]
    fn test_multiline_value_keeps_inner_lines() {
        let text = "----item----
id: {A0000000-0000-0000-0000-000000000001}
path: /sitecore/content/Home
parent: {B0000000-0000-0000-0000-000000000001}
name: Home
template: {C0000000-0000-0000-0000-000000000001}
templatekey: Page

----field----
field: {D0000000-0000-0000-0000-000000000001}
name: Body
key: body

line one
name: not a property

line three
";
        let items = parser().parse_str(text, &file(), Uuid::nil()).unwrap();
        assert_eq!(
            &*items[0].shared_fields[0].value,
            "line one\nname: not a property\n\nline three"
        );
    }

    #[test]
    fn test_empty_file_has_no_items() {
        assert!(parser().parse_str("", &file(), Uuid::nil()).unwrap().is_empty());
    }
}
