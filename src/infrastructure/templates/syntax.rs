//! Passes over template source around Tera's parser
//!
//! - [`normalize_filter_args`] rewrites positional arguments of the custom
//!   filters (`format_currency('USD')`) into keyword form
//!   (`format_currency(currency='USD')`), since Tera only accepts keyword
//!   arguments.
//! - [`free_variables`] walks the parsed Tera AST and lists the variables a
//!   template reads from its context without rendering it.

use std::borrow::Cow;
use std::collections::{BTreeSet, HashSet};
use std::ops::Range;

use tera::ast::{Expr, ExprVal, FunctionCall, Node};

/// Positional parameter names of each custom filter, in order
const FILTER_PARAMS: &[(&str, &[&str])] = &[
    ("format_number", &["decimal_places"]),
    ("format_currency", &["currency", "decimal_places"]),
    ("format_date", &["format"]),
    ("truncate_text", &["length", "suffix"]),
    ("json_pretty", &["indent"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Expression,
    Statement,
    Comment,
}

#[derive(Debug, Clone)]
struct Tag {
    kind: TagKind,
    /// Byte range of the text between the delimiters
    inner: Range<usize>,
}

impl Tag {
    fn body<'a>(&self, source: &'a str) -> &'a str {
        source[self.inner.clone()]
            .trim()
            .trim_start_matches('-')
            .trim_end_matches('-')
            .trim()
    }
}

/// Rewrite positional arguments of the custom filters into keyword arguments
pub fn normalize_filter_args(template: &str) -> Cow<'_, str> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for tag in code_tags(template) {
        if let Some(rewritten) = rewrite_filter_calls(&template[tag.inner.clone()]) {
            out.push_str(&template[last..tag.inner.start]);
            out.push_str(&rewritten);
            last = tag.inner.end;
        }
    }

    if last == 0 {
        return Cow::Borrowed(template);
    }
    out.push_str(&template[last..]);
    Cow::Owned(out)
}

/// Variables read from the render context, excluding loop and `set`
/// bindings, attributes, filter and test names, keyword argument names and
/// function names. Macro bodies only see their arguments and are skipped.
pub fn free_variables(ast: &[Node]) -> BTreeSet<String> {
    let mut walker = FreeVariables {
        free: BTreeSet::new(),
        scopes: vec![HashSet::new()],
    };
    walker.nodes(ast);
    walker.free
}

struct FreeVariables {
    free: BTreeSet<String>,
    /// Template level bindings first, then one frame per enclosing `for`
    scopes: Vec<HashSet<String>>,
}

impl FreeVariables {
    fn nodes(&mut self, nodes: &[Node]) {
        for node in nodes {
            match node {
                Node::VariableBlock(_, expr) => self.expr(expr),
                Node::Set(_, set) => {
                    self.expr(&set.value);
                    let frame = if set.global {
                        self.scopes.first_mut()
                    } else {
                        self.scopes.last_mut()
                    };
                    if let Some(frame) = frame {
                        frame.insert(set.key.clone());
                    }
                }
                Node::Forloop(_, forloop, _) => {
                    self.expr(&forloop.container);
                    let mut bound: HashSet<String> = forloop.key.iter().cloned().collect();
                    bound.insert(forloop.value.clone());
                    bound.insert("loop".to_string());
                    self.scopes.push(bound);
                    self.nodes(&forloop.body);
                    self.scopes.pop();
                    if let Some(empty_body) = &forloop.empty_body {
                        self.nodes(empty_body);
                    }
                }
                Node::If(branches, _) => {
                    for (_, condition, body) in &branches.conditions {
                        self.expr(condition);
                        self.nodes(body);
                    }
                    if let Some((_, body)) = &branches.otherwise {
                        self.nodes(body);
                    }
                }
                Node::FilterSection(_, section, _) => {
                    self.call(&section.filter);
                    self.nodes(&section.body);
                }
                Node::Block(_, block, _) => self.nodes(&block.body),
                _ => {}
            }
        }
    }

    fn expr(&mut self, expr: &Expr) {
        self.value(&expr.val);
        for filter in &expr.filters {
            self.call(filter);
        }
    }

    fn call(&mut self, call: &FunctionCall) {
        for arg in call.args.values() {
            self.expr(arg);
        }
    }

    fn value(&mut self, value: &ExprVal) {
        match value {
            ExprVal::Ident(ident) => self.ident(ident),
            ExprVal::Math(math) => {
                self.expr(&math.lhs);
                self.expr(&math.rhs);
            }
            ExprVal::Logic(logic) => {
                self.expr(&logic.lhs);
                self.expr(&logic.rhs);
            }
            ExprVal::In(membership) => {
                self.expr(&membership.lhs);
                self.expr(&membership.rhs);
            }
            ExprVal::Test(test) => {
                self.ident(&test.ident);
                for arg in &test.args {
                    self.expr(arg);
                }
            }
            ExprVal::FunctionCall(call) => self.call(call),
            ExprVal::MacroCall(call) => {
                for arg in call.args.values() {
                    self.expr(arg);
                }
            }
            ExprVal::Array(items) => {
                for item in items {
                    self.expr(item);
                }
            }
            ExprVal::StringConcat(concat) => {
                for part in &concat.values {
                    self.value(part);
                }
            }
            _ => {}
        }
    }

    /// `user.email` reads `user`; `rows[index]` reads `rows` and `index`
    fn ident(&mut self, ident: &str) {
        let root_end = ident.find(['.', '[']).unwrap_or(ident.len());
        let root = &ident[..root_end];
        if !root.is_empty() && !self.scopes.iter().any(|frame| frame.contains(root)) {
            self.free.insert(root.to_string());
        }

        for subscript in ident.split('[').skip(1) {
            let inner = subscript.split(']').next().unwrap_or_default().trim();
            if inner.as_bytes().first().is_some_and(|&b| is_ident_start(b)) {
                self.ident(inner);
            }
        }
    }
}

/// `{{ }}` and `{% %}` tags outside of `{% raw %}` blocks
fn code_tags(source: &str) -> Vec<Tag> {
    let mut tags = Vec::new();
    let mut in_raw = false;

    for tag in scan_tags(source) {
        if tag.kind == TagKind::Statement {
            let keyword = tag.body(source).split_whitespace().next().unwrap_or("");
            match keyword {
                "raw" => {
                    in_raw = true;
                    continue;
                }
                "endraw" => {
                    in_raw = false;
                    continue;
                }
                _ => {}
            }
        }
        if !in_raw && tag.kind != TagKind::Comment {
            tags.push(tag);
        }
    }
    tags
}

fn scan_tags(source: &str) -> Vec<Tag> {
    let bytes = source.as_bytes();
    let mut tags = Vec::new();
    let mut i = 0;

    while i + 1 < bytes.len() {
        if bytes[i] != b'{' {
            i += 1;
            continue;
        }
        let (kind, close): (TagKind, &[u8]) = match bytes[i + 1] {
            b'{' => (TagKind::Expression, b"}}"),
            b'%' => (TagKind::Statement, b"%}"),
            b'#' => (TagKind::Comment, b"#}"),
            _ => {
                i += 1;
                continue;
            }
        };
        let start = i + 2;
        let Some(end) = find_close(bytes, start, close, kind != TagKind::Comment) else {
            break;
        };
        tags.push(Tag {
            kind,
            inner: start..end,
        });
        i = end + close.len();
    }
    tags
}

fn find_close(bytes: &[u8], from: usize, close: &[u8], skip_strings: bool) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() {
        if skip_strings && matches!(bytes[i], b'"' | b'\'' | b'`') {
            i = string_end(bytes, i);
            continue;
        }
        if bytes[i..].starts_with(close) {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Index just past the string literal starting at `start`
fn string_end(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    bytes[start + 1..]
        .iter()
        .position(|&b| b == quote)
        .map_or(bytes.len(), |offset| start + offset + 2)
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn ident_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    i
}

fn skip_whitespace(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn rewrite_filter_calls(expr: &str) -> Option<String> {
    let bytes = expr.as_bytes();
    let mut out = String::new();
    let mut last = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' | b'`' => i = string_end(bytes, i),
            b'|' => {
                let name_start = skip_whitespace(bytes, i + 1);
                let name_end = ident_end(bytes, name_start);
                let open = skip_whitespace(bytes, name_end);
                let params = FILTER_PARAMS
                    .iter()
                    .find(|(name, _)| *name == &expr[name_start..name_end])
                    .map(|(_, params)| *params);

                match params {
                    Some(params) if bytes.get(open) == Some(&b'(') => {
                        let close = matching_paren(bytes, open)?;
                        if let Some(args) = keyword_args(&expr[open + 1..close], params) {
                            out.push_str(&expr[last..=open]);
                            out.push_str(&args);
                            last = close;
                        }
                        i = close + 1;
                    }
                    _ => i = name_end.max(i + 1),
                }
            }
            _ => i += 1,
        }
    }

    if last == 0 {
        return None;
    }
    out.push_str(&expr[last..]);
    Some(out)
}

fn matching_paren(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' | b'`' => {
                i = string_end(bytes, i);
                continue;
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Rewrite `'USD', 2` as `currency='USD', decimal_places=2`; `None` when nothing changes
fn keyword_args(args: &str, params: &[&str]) -> Option<String> {
    let mut rewritten = Vec::new();
    let mut positional = 0;

    for arg in split_top_level(args) {
        let arg = arg.trim();
        if arg.is_empty() {
            continue;
        }
        if is_keyword_arg(arg) {
            rewritten.push(arg.to_string());
        } else {
            let name = params.get(positional)?;
            positional += 1;
            rewritten.push(format!("{name}={arg}"));
        }
    }

    (positional > 0).then(|| rewritten.join(", "))
}

fn is_keyword_arg(arg: &str) -> bool {
    let bytes = arg.as_bytes();
    if bytes.first().is_none_or(|&b| !is_ident_start(b)) {
        return false;
    }
    let after = skip_whitespace(bytes, ident_end(bytes, 0));
    bytes.get(after) == Some(&b'=') && bytes.get(after + 1) != Some(&b'=')
}

fn split_top_level(args: &str) -> Vec<&str> {
    let bytes = args.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' | b'`' => {
                i = string_end(bytes, i);
                continue;
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                parts.push(&args[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(&args[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(template: &str) -> Vec<String> {
        let parsed = tera::Template::new("t", None, template).unwrap();
        free_variables(&parsed.ast).into_iter().collect()
    }

    #[test]
    fn test_positional_arguments_become_keywords() {
        assert_eq!(
            normalize_filter_args("{{ price | format_currency('USD') }}"),
            "{{ price | format_currency(currency='USD') }}"
        );
        assert_eq!(
            normalize_filter_args("{{ d|truncate_text(20, \"…\") }} {{ n | format_number(0) }}"),
            "{{ d|truncate_text(length=20, suffix=\"…\") }} {{ n | format_number(decimal_places=0) }}"
        );
    }

    #[test]
    fn test_keyword_and_mixed_arguments() {
        assert_eq!(
            normalize_filter_args("{{ p | format_currency('EUR', decimal_places=2) }}"),
            "{{ p | format_currency(currency='EUR', decimal_places=2) }}"
        );
        let untouched = "{{ p | format_currency(currency='USD') }} {{ x | round(2) }}";
        assert!(matches!(normalize_filter_args(untouched), Cow::Borrowed(_)));
    }

    #[test]
    fn test_statement_tags_and_literals_are_handled() {
        assert_eq!(
            normalize_filter_args("{% set t = total | format_number(1) %}'| format_number(3)'"),
            "{% set t = total | format_number(decimal_places=1) %}'| format_number(3)'"
        );
        assert_eq!(
            normalize_filter_args("{{ 'a | format_number(2)' }}"),
            "{{ 'a | format_number(2)' }}"
        );
    }

    #[test]
    fn test_raw_blocks_are_not_rewritten() {
        let template = "{% raw %}{{ p | format_date('%Y') }}{% endraw %}";
        assert_eq!(normalize_filter_args(template), template);
    }

    #[test]
    fn test_free_variables_basic() {
        assert_eq!(
            vars("{{ name }}: {{ price | format_currency(currency='USD') }} {{ user.email }}"),
            vec!["name", "price", "user"]
        );
    }

    #[test]
    fn test_free_variables_exclude_loop_and_set_bindings() {
        let template = "{% for item in items %}{{ item.name }} {{ loop.index }} {{ currency }}{% endfor %}\
                        {% set total = subtotal + tax %}{{ total }}{{ item }}";
        assert_eq!(
            vars(template),
            vec!["currency", "item", "items", "subtotal", "tax"]
        );
    }

    #[test]
    fn test_free_variables_exclude_tests_functions_and_keywords() {
        let template = "{% if stock is defined and not archived %}{{ range(end=3) }}{% elif x is not none %}{{ true }}{% endif %}{# {{ hidden }} #}";
        assert_eq!(vars(template), vec!["archived", "stock", "x"]);
    }

    #[test]
    fn test_for_with_key_value_targets() {
        assert_eq!(
            vars("{% for key, value in data %}{{ key }}={{ value }}{% endfor %}"),
            vec!["data"]
        );
    }

    #[test]
    fn test_set_inside_loop_does_not_leak() {
        assert_eq!(
            vars("{% for x in xs %}{% set last = x %}{% endfor %}{{ last }}"),
            vec!["last", "xs"]
        );
        assert_eq!(
            vars("{% for x in xs %}{% set_global last = x %}{% endfor %}{{ last }}"),
            vec!["xs"]
        );
    }

    #[test]
    fn test_subscripts_filter_arguments_and_membership() {
        let template = "{{ rows[index].name }} {{ rows[0] }} {{ price | format_currency(currency=cur) }}\
                        {% if 'sale' in tags %}{{ label ~ suffix }}{% endif %}";
        assert_eq!(
            vars(template),
            vec!["cur", "index", "label", "price", "rows", "suffix", "tags"]
        );
    }

    #[test]
    fn test_raw_and_else_bodies() {
        assert_eq!(
            vars("{% raw %}{{ hidden }}{% endraw %}{% for p in products %}{{ p }}{% else %}{{ fallback }}{% endfor %}"),
            vec!["fallback", "products"]
        );
    }
}
