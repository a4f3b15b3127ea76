//! Line-oriented extraction used when no syntax tree is available.
//!
//! Lower fidelity than the tree walker but never fails: anything it cannot
//! recognize is simply absent from the result.

use lazy_static::lazy_static;
use regex::Regex;

use super::is_hook_name;
use crate::analysis::context::AnalysisContext;
use crate::analysis::model::{
    CallRecord, ClassRecord, ComponentKind, ComponentRecord, FunctionRecord, HookCallRecord,
    ImportRecord, ModuleAnalysis, ParameterKind, ParameterRecord, TypeDeclRecord,
};
use crate::validate::signature::SignatureValidator;
use crate::validate::text::{balanced_inner, is_comment_line, split_args};
use crate::validate::value::line_of;

const CALL_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "function", "return", "typeof", "await", "new",
    "super", "import", "require", "constructor", "async",
];

lazy_static! {
    static ref IMPORT_FROM: Regex = Regex::new(
        r#"(?ms)^[ \t]*import\s+(?:type\s+)?([^'";]+?)\s+from\s+['"]([^'"]+)['"]"#
    ).unwrap();

    static ref IMPORT_BARE: Regex = Regex::new(r#"(?m)^[ \t]*import\s+['"]([^'"]+)['"]"#).unwrap();

    static ref REQUIRE: Regex = Regex::new(
        r#"(?:const|let|var)\s+(\{[^}]*\}|[\w$]+)\s*=\s*require\(\s*['"]([^'"]+)['"]\s*\)"#
    ).unwrap();

    static ref CLASS_DECL: Regex = Regex::new(
        r"(?m)^[ \t]*(export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+([\w$]+)(?:\s*<[^>{]*>)?(?:\s+extends\s+([\w$.]+))?(?:\s*<[^>{]*>)?(?:\s+implements\s+([\w$.,\s]+?))?\s*\{"
    ).unwrap();

    static ref INTERFACE_DECL: Regex = Regex::new(
        r"(?m)^[ \t]*(export\s+)?(?:declare\s+)?interface\s+([\w$]+)\s*(<[^{]*>)?"
    ).unwrap();

    static ref TYPE_DECL: Regex = Regex::new(
        r"(?m)^[ \t]*(export\s+)?(?:declare\s+)?type\s+([\w$]+)\s*(<[^=]*>)?\s*="
    ).unwrap();

    static ref EXPORTED_NAME: Regex = Regex::new(
        r"(?m)^[ \t]*export\s+(?:default\s+)?(?:declare\s+)?(?:async\s+)?(?:abstract\s+)?(?:const|let|var|function\*?|class|interface|type|enum)\s+([\w$]+)"
    ).unwrap();

    static ref EXPORT_LIST: Regex = Regex::new(r"(?m)^[ \t]*export\s*(?:type\s*)?\{([^}]*)\}").unwrap();

    static ref EXPORT_DEFAULT_NAME: Regex = Regex::new(r"(?m)^[ \t]*export\s+default\s+([\w$]+)\s*;?\s*$").unwrap();

    static ref ASYNC_DECL: Regex = Regex::new(r"^[ \t]*(?:export\s+)?(?:default\s+)?(?:async\s+function|(?:const|let|var)\s+[\w$]+\s*(?::[^=]+)?=\s*async\b)").unwrap();

    static ref DESTRUCTURED_PROPS: Regex = Regex::new(r"\(\s*\{([^}]*)\}").unwrap();

    static ref HOOK_CALL: Regex = Regex::new(r"\b(?:React\.)?(use[A-Za-z0-9_]*)\s*(?:<[^>()]*>)?\s*\(").unwrap();

    static ref HOOK_BINDING: Regex = Regex::new(
        r"(?:const|let|var)\s+(\[[^\]]*\]|\{[^}]*\}|[\w$]+)\s*=\s*(?:React\.)?use[A-Za-z0-9_]*\s*(?:<[^>()]*>)?\s*\($"
    ).unwrap();

    static ref MEMBER_CALL: Regex = Regex::new(r"([A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*)\.([A-Za-z_$][\w$]*)\s*\(").unwrap();

    static ref PLAIN_CALL: Regex = Regex::new(r"(^|[^\w$.])([A-Za-z_$][\w$]*)\s*\(").unwrap();
}

fn imported_names(clause: &str, module: &str, is_internal: bool, line: usize) -> Vec<ImportRecord> {
    let record = |imported: Option<String>, alias: Option<String>, is_default, is_namespace| {
        ImportRecord {
            module: module.to_string(),
            imported_name: imported,
            local_alias: alias,
            is_default,
            is_namespace,
            is_internal,
            line,
        }
    };

    let mut out = Vec::new();
    let clause = clause.trim();
    let (head, braces) = match clause.find('{') {
        Some(open) => (
            clause[..open].trim().trim_end_matches(',').trim(),
            clause[open + 1..].split('}').next(),
        ),
        None => (clause, None),
    };

    for part in head.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if let Some(ns) = part.strip_prefix('*') {
            let alias = ns.trim().trim_start_matches("as").trim();
            out.push(record(Some(alias.to_string()), None, false, true));
        } else {
            out.push(record(Some(part.to_string()), None, true, false));
        }
    }

    for item in braces.into_iter().flat_map(|b| b.split(',')) {
        let item = item.trim().trim_start_matches("type ").trim();
        if item.is_empty() {
            continue;
        }
        let mut words = item.split_whitespace();
        let imported = words.next().unwrap_or_default().to_string();
        let alias = match (words.next(), words.next()) {
            (Some("as"), Some(alias)) => Some(alias.to_string()),
            _ => None,
        };
        out.push(record(Some(imported), alias, false, false));
    }
    out
}

fn imports(content: &str, ctx: &AnalysisContext, out: &mut ModuleAnalysis) {
    for caps in IMPORT_FROM.captures_iter(content) {
        let module = &caps[2];
        let line = line_of(content, caps.get(0).map_or(0, |m| m.start()));
        out.imports
            .extend(imported_names(&caps[1], module, ctx.is_internal(module), line));
    }
    for caps in IMPORT_BARE.captures_iter(content) {
        let module = &caps[1];
        out.imports.push(ImportRecord {
            module: module.to_string(),
            imported_name: None,
            local_alias: None,
            is_default: false,
            is_namespace: false,
            is_internal: ctx.is_internal(module),
            line: line_of(content, caps.get(1).map_or(0, |m| m.start())),
        });
    }
    for caps in REQUIRE.captures_iter(content) {
        let module = &caps[2];
        let line = line_of(content, caps.get(0).map_or(0, |m| m.start()));
        let binding = &caps[1];
        let is_internal = ctx.is_internal(module);
        match binding.strip_prefix('{') {
            Some(names) => {
                let clause = format!("{{{}", names.replace(':', " as "));
                out.imports
                    .extend(imported_names(&clause, module, is_internal, line));
            }
            None => out
                .imports
                .extend(imported_names(binding, module, is_internal, line)),
        }
    }
}

fn exports(content: &str, out: &mut ModuleAnalysis) {
    for caps in EXPORTED_NAME.captures_iter(content) {
        out.exports.push(caps[1].to_string());
    }
    for caps in EXPORT_LIST.captures_iter(content) {
        for item in caps[1].split(',') {
            let mut words = item.split_whitespace();
            let local = words.next().unwrap_or_default();
            let exported = match (words.next(), words.next()) {
                (Some("as"), Some(name)) => name,
                _ => local,
            };
            if !exported.is_empty() {
                out.exports.push(exported.to_string());
            }
        }
    }
    for caps in EXPORT_DEFAULT_NAME.captures_iter(content) {
        out.exports.push(caps[1].to_string());
    }
}

fn declarations(content: &str, out: &mut ModuleAnalysis) {
    let lines: Vec<&str> = content.lines().collect();
    let line_text = |n: usize| lines.get(n.saturating_sub(1)).copied().unwrap_or("");

    for declared in SignatureValidator::new().declared_functions(content) {
        let text = line_text(declared.line);
        if declared.is_component() {
            let kind = if text.contains("function") {
                ComponentKind::Function
            } else {
                ComponentKind::Arrow
            };
            let props = DESTRUCTURED_PROPS
                .captures(text)
                .map(|c| {
                    c[1].split(',')
                        .filter_map(|p| {
                            let name = p.split([':', '=']).next()?.trim();
                            (!name.is_empty()).then(|| name.to_string())
                        })
                        .collect()
                })
                .unwrap_or_default();
            out.components.push(ComponentRecord {
                name: declared.name,
                kind,
                props,
                hooks_used: Vec::new(),
                is_exported: declared.exported,
                line: declared.line,
            });
        } else {
            let parameters = declared
                .params
                .iter()
                .map(|p| ParameterRecord {
                    name: p.name.clone(),
                    type_annotation: p.type_annotation.clone().unwrap_or_else(|| "any".into()),
                    optional: p.optional || p.rest,
                    default: None,
                    kind: if p.rest {
                        ParameterKind::VarPositional
                    } else {
                        ParameterKind::Positional
                    },
                })
                .collect();
            out.functions.push(FunctionRecord {
                name: declared.name,
                parameters,
                return_type: None,
                is_async: ASYNC_DECL.is_match(text),
                is_exported: declared.exported,
                line: declared.line,
            });
        }
    }

    for caps in CLASS_DECL.captures_iter(content) {
        let name = caps[2].to_string();
        let line = line_of(content, caps.get(2).map_or(0, |m| m.start()));
        let extends = caps.get(3).map(|m| m.as_str().to_string());
        let is_component = extends.as_deref().map_or(false, |base| {
            matches!(base.rsplit('.').next(), Some("Component" | "PureComponent"))
        });
        if is_component {
            out.components.push(ComponentRecord {
                name,
                kind: ComponentKind::Class,
                props: Vec::new(),
                hooks_used: Vec::new(),
                is_exported: caps.get(1).is_some(),
                line,
            });
            continue;
        }
        out.classes.push(ClassRecord {
            name,
            methods: Vec::new(),
            attributes: Vec::new(),
            extends,
            implements: caps
                .get(4)
                .map(|m| {
                    m.as_str()
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            is_exported: caps.get(1).is_some(),
            line,
        });
    }

    for (re, interface) in [(&*INTERFACE_DECL, true), (&*TYPE_DECL, false)] {
        for caps in re.captures_iter(content) {
            let record = TypeDeclRecord {
                name: caps[2].to_string(),
                type_parameters: caps.get(3).map(|m| m.as_str().trim().to_string()),
                is_exported: caps.get(1).is_some(),
                line: line_of(content, caps.get(2).map_or(0, |m| m.start())),
            };
            if interface {
                out.interfaces.push(record);
            } else {
                out.type_aliases.push(record);
            }
        }
    }
}

fn call_args(content: &str, open: usize) -> Vec<String> {
    balanced_inner(content, open)
        .map(|inner| {
            split_args(inner)
                .into_iter()
                .map(|a| a.trim().trim_matches(|c| c == '\'' || c == '"').to_string())
                .filter(|a| !a.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn calls(content: &str, out: &mut ModuleAnalysis) {
    let mut offset = 0;
    for (index, raw) in content.split_inclusive('\n').enumerate() {
        let start = offset;
        offset += raw.len();
        let line = raw.trim_end_matches(['\n', '\r']);
        if is_comment_line(line) || line.trim_start().starts_with("import ") {
            continue;
        }
        let line_no = index + 1;

        for caps in HOOK_CALL.captures_iter(line) {
            let name = &caps[1];
            if !is_hook_name(name) {
                continue;
            }
            let whole = caps.get(0).map_or(0..0, |m| m.range());
            let prefix = &line[..whole.end];
            let bound_variable = HOOK_BINDING
                .captures(prefix.trim_start())
                .map(|b| b[1].split_whitespace().collect::<Vec<_>>().join(" "));
            out.hook_calls.push(HookCallRecord {
                hook_name: name.to_string(),
                args: call_args(content, start + whole.end - 1),
                bound_variable,
                line: line_no,
            });
        }

        for caps in MEMBER_CALL.captures_iter(line) {
            let end = caps.get(0).map_or(0, |m| m.end());
            let callee = &caps[2];
            if is_hook_name(callee) {
                continue;
            }
            out.calls.push(CallRecord {
                callee_name: callee.to_string(),
                receiver_name: Some(caps[1].to_string()),
                args: call_args(content, start + end - 1),
                line: line_no,
            });
        }

        for caps in PLAIN_CALL.captures_iter(line) {
            let callee = &caps[2];
            if CALL_KEYWORDS.contains(&callee) || is_hook_name(callee) {
                continue;
            }
            let end = caps.get(0).map_or(0, |m| m.end());
            out.calls.push(CallRecord {
                callee_name: callee.to_string(),
                receiver_name: None,
                args: call_args(content, start + end - 1),
                line: line_no,
            });
        }
    }
}

/// Attach each hook call to the closest component declared above it.
fn attribute_hooks(out: &mut ModuleAnalysis) {
    let mut owners: Vec<(usize, Option<usize>)> = out
        .components
        .iter()
        .enumerate()
        .map(|(i, c)| (c.line, Some(i)))
        .chain(out.functions.iter().map(|f| (f.line, None)))
        .collect();
    owners.sort_by_key(|(line, _)| *line);

    for hook in &out.hook_calls {
        let owner = owners
            .iter()
            .take_while(|(line, _)| *line <= hook.line)
            .last()
            .and_then(|(_, idx)| *idx);
        if let Some(idx) = owner {
            out.components[idx].hooks_used.push(hook.hook_name.clone());
        }
    }
}

/// Extract what the patterns can recover from `content` into `out`.
pub fn extract(content: &str, ctx: &AnalysisContext, mut out: ModuleAnalysis) -> ModuleAnalysis {
    imports(content, ctx, &mut out);
    exports(content, &mut out);
    declarations(content, &mut out);
    calls(content, &mut out);
    attribute_hooks(&mut out);

    let exports = out.exports.clone();
    for c in &mut out.components {
        c.is_exported = c.is_exported || exports.contains(&c.name);
    }
    for f in &mut out.functions {
        f.is_exported = f.is_exported || exports.contains(&f.name);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::model::Language;

    const SOURCE: &str = r#"import React, { useState, useEffect as useFx } from 'react';
import * as api from './api';
import './styles.css';
const path = require('path');

interface CounterProps<T> {
  step: number;
}

export const Counter = ({ label, step = 1 }: CounterProps<number>) => {
  const [count, setCount] = useState(0);
  useFx(() => {
    api.track('count', count);
  }, [count]);
  return <button onClick={() => setCount(count + step)}>{label}</button>;
};

export async function loadUser(id: string, retries?: number) {
  return api.fetchUser(id);
}

class Legacy extends React.Component {
  render() { return null; }
}

export default Legacy;
"#;

    fn run(source: &str) -> ModuleAnalysis {
        let ctx = AnalysisContext::new("/repo");
        let out = ModuleAnalysis::new("src/Counter.tsx", "src/Counter", Language::TypeScript);
        extract(source, &ctx, out)
    }

    #[test]
    fn test_fallback_imports() {
        let analysis = run(SOURCE);
        let modules: Vec<&str> = analysis.imports.iter().map(|i| i.module.as_str()).collect();
        assert_eq!(modules, vec!["react", "react", "react", "./api", "./styles.css", "path"]);

        assert!(analysis.imports[0].is_default);
        assert_eq!(analysis.imports[2].local_name(), Some("useFx"));
        assert!(analysis.imports[3].is_namespace);
        assert_eq!(analysis.imports[3].imported_name.as_deref(), Some("api"));
        assert!(analysis.imports[3].is_internal);
        assert!(analysis.imports[4].imported_name.is_none());
        assert_eq!(analysis.imports[5].line, 4);
    }

    #[test]
    fn test_fallback_declarations() {
        let analysis = run(SOURCE);

        let counter = analysis.components.iter().find(|c| c.name == "Counter").unwrap();
        assert_eq!(counter.kind, ComponentKind::Arrow);
        assert_eq!(counter.props, vec!["label", "step"]);
        assert!(counter.is_exported);
        assert_eq!(counter.line, 10);
        assert!(counter.hooks_used.contains(&"useState".to_string()));

        let legacy = analysis.components.iter().find(|c| c.name == "Legacy").unwrap();
        assert_eq!(legacy.kind, ComponentKind::Class);
        assert!(legacy.is_exported);

        let load = analysis.functions.iter().find(|f| f.name == "loadUser").unwrap();
        assert!(load.is_async);
        assert!(load.is_exported);
        assert_eq!(load.parameters.len(), 2);
        assert!(load.parameters[1].optional);

        assert_eq!(analysis.interfaces[0].name, "CounterProps");
        assert_eq!(analysis.interfaces[0].type_parameters.as_deref(), Some("<T>"));
    }

    #[test]
    fn test_fallback_hooks_and_calls() {
        let analysis = run(SOURCE);

        let state = analysis
            .hook_calls
            .iter()
            .find(|h| h.hook_name == "useState")
            .unwrap();
        assert_eq!(state.bound_variable.as_deref(), Some("[count, setCount]"));
        assert_eq!(state.args, vec!["0"]);
        assert_eq!(state.line, 11);

        let track = analysis.calls.iter().find(|c| c.callee_name == "track").unwrap();
        assert_eq!(track.receiver_name.as_deref(), Some("api"));
        assert_eq!(track.args, vec!["count", "count"]);
        assert!(analysis.calls.iter().all(|c| c.callee_name != "if"));
    }

    #[test]
    fn test_fallback_crlf_matches_lf() {
        let source = "const [open, setOpen] = useState(false);\nuseEffect(() => setOpen(true), [open]);\nconst flag = useToggle(false, true);\n";
        let lf = run(source);
        let crlf = run(&source.replace('\n', "\r\n"));

        let args = |a: &ModuleAnalysis| -> Vec<Vec<String>> { a.hook_calls.iter().map(|h| h.args.clone()).collect() };
        assert_eq!(args(&lf), args(&crlf));
        let toggle = crlf.hook_calls.iter().find(|h| h.hook_name == "useToggle").unwrap();
        assert_eq!(toggle.args, vec!["false", "true"]);
        assert_eq!(toggle.line, 3);
    }

    #[test]
    fn test_fallback_crlf_after_multibyte_comments() {
        let mut source = "// éééééééééé\r\n".repeat(30);
        source.push_str("const [n, setN] = useState(1);\r\napi.save(n, 'ü');\r\n");
        let analysis = run(&source);

        let state = analysis.hook_calls.iter().find(|h| h.hook_name == "useState").unwrap();
        assert_eq!(state.args, vec!["1"]);
        let save = analysis.calls.iter().find(|c| c.callee_name == "save").unwrap();
        assert_eq!(save.args, vec!["n", "ü"]);
    }

    #[test]
    fn test_fallback_tolerates_garbage() {
        let analysis = run("export const = => {{{ <div");
        assert!(analysis.components.is_empty());
        assert!(analysis.functions.is_empty());
    }
}
