//! Walker over the Babel program tree produced by the bridge.
//!
//! The tree arrives as plain JSON, so every accessor here tolerates
//! missing or unexpected fields and simply skips what it cannot read.

use serde_json::Value;
use std::collections::HashMap;

use super::is_hook_name;
use crate::analysis::context::AnalysisContext;
use crate::analysis::model::{
    AttributeRecord, CallRecord, ClassRecord, ComponentKind, ComponentRecord, FunctionRecord,
    HookCallRecord, ImportRecord, ModuleAnalysis, ParameterKind, ParameterRecord, TypeDeclRecord,
    Visibility,
};

const COMPONENT_BASES: &[&str] = &["Component", "PureComponent"];
const COMPONENT_WRAPPERS: &[&str] = &["memo", "forwardRef"];

fn kind(node: &Value) -> &str {
    node.get("type").and_then(Value::as_str).unwrap_or("")
}

fn line(node: &Value) -> usize {
    node.pointer("/loc/start/line")
        .and_then(Value::as_u64)
        .unwrap_or(0) as usize
}

/// Name of an `Identifier`, or the value of a `StringLiteral` used as a name.
fn ident(node: Option<&Value>) -> Option<&str> {
    let node = node?;
    match kind(node) {
        "Identifier" | "JSXIdentifier" => node.get("name").and_then(Value::as_str),
        "StringLiteral" => node.get("value").and_then(Value::as_str),
        "PrivateName" => ident(node.get("id")),
        _ => None,
    }
}

fn flag(node: &Value, key: &str) -> bool {
    node.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn items<'a>(node: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    node.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|v| !v.is_null())
}

fn is_capitalized(name: &str) -> bool {
    name.chars().next().map_or(false, |c| c.is_ascii_uppercase())
}

fn is_function_node(node: &Value) -> bool {
    matches!(
        kind(node),
        "FunctionDeclaration" | "FunctionExpression" | "ArrowFunctionExpression"
    )
}

/// Dotted text of a callee or receiver expression, e.g. `React.memo`.
fn expr_path(node: &Value) -> Option<String> {
    match kind(node) {
        "Identifier" => ident(Some(node)).map(str::to_string),
        "ThisExpression" => Some("this".into()),
        "Super" => Some("super".into()),
        "MemberExpression" | "OptionalMemberExpression" => {
            let object = expr_path(node.get("object")?)?;
            let property = node.get("property")?;
            let prop = if flag(node, "computed") {
                format!("[{}]", arg_text(property))
            } else {
                ident(Some(property))?.to_string()
            };
            Some(format!("{}.{}", object, prop))
        }
        "CallExpression" | "OptionalCallExpression" => {
            Some(format!("{}()", expr_path(node.get("callee")?)?))
        }
        "AwaitExpression" => expr_path(node.get("argument")?),
        _ => None,
    }
}

/// Short textual form of a call argument.
fn arg_text(node: &Value) -> String {
    match kind(node) {
        "StringLiteral" => node
            .get("value")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        "NumericLiteral" | "BooleanLiteral" => node
            .get("value")
            .map(|v| v.to_string())
            .unwrap_or_default(),
        "NullLiteral" => "null".into(),
        "Identifier" | "MemberExpression" | "ThisExpression" => {
            expr_path(node).unwrap_or_else(|| "<expression>".into())
        }
        "ArrayExpression" => "[]".into(),
        "ObjectExpression" => "{}".into(),
        "TemplateLiteral" => {
            let quasis: Vec<&str> = items(node, "quasis")
                .filter_map(|q| q.pointer("/value/cooked").and_then(Value::as_str))
                .collect();
            format!("`{}`", quasis.join("${...}"))
        }
        other => format!("<{}>", other),
    }
}

/// Canonical text of a TypeScript type annotation node.
pub fn type_text(node: &Value) -> String {
    match kind(node) {
        "TSTypeAnnotation" | "TypeAnnotation" => node
            .get("typeAnnotation")
            .map(type_text)
            .unwrap_or_else(|| "any".into()),
        "TSStringKeyword" => "string".into(),
        "TSNumberKeyword" => "number".into(),
        "TSBooleanKeyword" => "boolean".into(),
        "TSAnyKeyword" => "any".into(),
        "TSUnknownKeyword" => "unknown".into(),
        "TSVoidKeyword" => "void".into(),
        "TSNullKeyword" => "null".into(),
        "TSUndefinedKeyword" => "undefined".into(),
        "TSNeverKeyword" => "never".into(),
        "TSObjectKeyword" => "object".into(),
        "TSBigIntKeyword" => "bigint".into(),
        "TSSymbolKeyword" => "symbol".into(),
        "TSTypeReference" => {
            let name = node
                .get("typeName")
                .map(qualified_name)
                .unwrap_or_else(|| "any".into());
            match type_arguments(node) {
                Some(args) => format!("{}<{}>", name, args),
                None => name,
            }
        }
        "TSArrayType" => {
            let element = node.get("elementType").map(type_text).unwrap_or_default();
            match node.get("elementType").map(kind) {
                Some("TSUnionType") | Some("TSFunctionType") => format!("({})[]", element),
                _ => format!("{}[]", element),
            }
        }
        "TSUnionType" => join_types(node, " | "),
        "TSIntersectionType" => join_types(node, " & "),
        "TSTupleType" => format!("[{}]", join_list(node, "elementTypes")),
        "TSParenthesizedType" => node
            .get("typeAnnotation")
            .map(type_text)
            .unwrap_or_default(),
        "TSLiteralType" => node
            .get("literal")
            .map(|lit| match kind(lit) {
                "StringLiteral" => format!("'{}'", arg_text(lit)),
                _ => arg_text(lit),
            })
            .unwrap_or_default(),
        "TSTypeLiteral" => "object".into(),
        "TSFunctionType" => {
            let ret = node
                .get("typeAnnotation")
                .or_else(|| node.get("returnType"))
                .map(type_text)
                .unwrap_or_else(|| "void".into());
            format!("(...) => {}", ret)
        }
        "TSTypeOperator" => {
            let op = node.get("operator").and_then(Value::as_str).unwrap_or("keyof");
            let inner = node.get("typeAnnotation").map(type_text).unwrap_or_default();
            format!("{} {}", op, inner)
        }
        "TSIndexedAccessType" => {
            let object = node.get("objectType").map(type_text).unwrap_or_default();
            let index = node.get("indexType").map(type_text).unwrap_or_default();
            format!("{}[{}]", object, index)
        }
        _ => "any".into(),
    }
}

fn qualified_name(node: &Value) -> String {
    match kind(node) {
        "TSQualifiedName" => format!(
            "{}.{}",
            node.get("left").map(qualified_name).unwrap_or_default(),
            ident(node.get("right")).unwrap_or("")
        ),
        _ => ident(Some(node)).unwrap_or("any").to_string(),
    }
}

fn type_arguments(node: &Value) -> Option<String> {
    let params = node
        .get("typeParameters")
        .or_else(|| node.get("typeArguments"))
        .filter(|v| !v.is_null())?;
    let rendered = join_list(params, "params");
    (!rendered.is_empty()).then_some(rendered)
}

fn join_types(node: &Value, sep: &str) -> String {
    items(node, "types").map(type_text).collect::<Vec<_>>().join(sep)
}

fn join_list(node: &Value, key: &str) -> String {
    items(node, key).map(type_text).collect::<Vec<_>>().join(", ")
}

/// `<T, K extends keyof T>` style rendering of declared type parameters.
fn type_parameters(node: &Value) -> Option<String> {
    let decl = node.get("typeParameters").filter(|v| !v.is_null())?;
    let names: Vec<String> = items(decl, "params")
        .filter_map(|p| {
            let name = p
                .get("name")
                .and_then(|n| n.as_str().map(str::to_string).or_else(|| ident(Some(n)).map(str::to_string)))?;
            Some(match p.get("constraint").filter(|c| !c.is_null()) {
                Some(c) => format!("{} extends {}", name, type_text(c)),
                None => name,
            })
        })
        .collect();
    (!names.is_empty()).then(|| format!("<{}>", names.join(", ")))
}

fn annotation(node: &Value) -> Option<String> {
    node.get("typeAnnotation")
        .filter(|v| !v.is_null())
        .map(type_text)
}

fn parameter(node: &Value) -> Option<ParameterRecord> {
    match kind(node) {
        "Identifier" => Some(ParameterRecord {
            name: ident(Some(node))?.to_string(),
            type_annotation: annotation(node).unwrap_or_else(|| "any".into()),
            optional: flag(node, "optional"),
            default: None,
            kind: ParameterKind::Positional,
        }),
        "AssignmentPattern" => {
            let mut param = parameter(node.get("left")?)?;
            param.optional = true;
            param.default = node.get("right").map(arg_text);
            Some(param)
        }
        "RestElement" => {
            let mut param = parameter(node.get("argument")?)?;
            if let Some(t) = annotation(node) {
                param.type_annotation = t;
            }
            param.optional = true;
            param.kind = ParameterKind::VarPositional;
            Some(param)
        }
        "ObjectPattern" => Some(ParameterRecord {
            name: "props".into(),
            type_annotation: annotation(node).unwrap_or_else(|| "object".into()),
            optional: false,
            default: None,
            kind: ParameterKind::Positional,
        }),
        "ArrayPattern" => Some(ParameterRecord {
            name: "items".into(),
            type_annotation: annotation(node).unwrap_or_else(|| "any[]".into()),
            optional: false,
            default: None,
            kind: ParameterKind::Positional,
        }),
        "TSParameterProperty" => parameter(node.get("parameter")?),
        _ => None,
    }
}

fn parameters(func: &Value) -> Vec<ParameterRecord> {
    items(func, "params").filter_map(parameter).collect()
}

fn function_record(name: &str, func: &Value, at: &Value) -> FunctionRecord {
    FunctionRecord {
        name: name.to_string(),
        parameters: parameters(func),
        return_type: func
            .get("returnType")
            .filter(|v| !v.is_null())
            .map(type_text),
        is_async: flag(func, "async"),
        is_exported: false,
        line: line(at),
    }
}

/// Prop names destructured from a component's first parameter.
fn props_of(func: &Value) -> Vec<String> {
    let Some(first) = items(func, "params").next() else {
        return Vec::new();
    };
    let pattern = match kind(first) {
        "AssignmentPattern" => first.get("left").unwrap_or(first),
        _ => first,
    };
    if kind(pattern) != "ObjectPattern" {
        return Vec::new();
    }
    items(pattern, "properties")
        .filter_map(|p| match kind(p) {
            "ObjectProperty" => ident(p.get("key")).map(str::to_string),
            "RestElement" => ident(p.get("argument")).map(|n| format!("...{}", n)),
            _ => None,
        })
        .collect()
}

fn hook_name_of(callee: &Value) -> Option<&str> {
    let name = match kind(callee) {
        "Identifier" => ident(Some(callee))?,
        "MemberExpression" => ident(callee.get("property"))?,
        _ => return None,
    };
    is_hook_name(name).then_some(name)
}

/// Depth-first pre-order visit of every typed node under `node`.
fn walk<'a>(node: &'a Value, visit: &mut dyn FnMut(&'a Value)) {
    match node {
        Value::Object(map) => {
            if map.contains_key("type") {
                visit(node);
            }
            for (key, child) in map {
                if key != "loc" {
                    walk(child, visit);
                }
            }
        }
        Value::Array(list) => {
            for child in list {
                walk(child, visit);
            }
        }
        _ => {}
    }
}

fn hooks_in(body: &Value) -> Vec<String> {
    let mut hooks = Vec::new();
    walk(body, &mut |node| {
        if matches!(kind(node), "CallExpression" | "OptionalCallExpression") {
            if let Some(name) = node.get("callee").and_then(hook_name_of) {
                hooks.push(name.to_string());
            }
        }
    });
    hooks
}

fn binding_text(pattern: &Value) -> Option<String> {
    match kind(pattern) {
        "Identifier" => ident(Some(pattern)).map(str::to_string),
        "ArrayPattern" => {
            let names: Vec<&str> = items(pattern, "elements")
                .filter_map(|e| ident(Some(e)))
                .collect();
            Some(format!("[{}]", names.join(", ")))
        }
        "ObjectPattern" => {
            let names: Vec<&str> = items(pattern, "properties")
                .filter_map(|p| ident(p.get("value")).or_else(|| ident(p.get("key"))))
                .collect();
            Some(format!("{{{}}}", names.join(", ")))
        }
        _ => None,
    }
}

struct Walker<'c> {
    ctx: &'c AnalysisContext,
    out: ModuleAnalysis,
}

impl<'c> Walker<'c> {
    fn import(&mut self, node: &Value) {
        let Some(module) = node.pointer("/source/value").and_then(Value::as_str) else {
            return;
        };
        let is_internal = self.ctx.is_internal(module);
        let at = line(node);
        let mut specifiers = items(node, "specifiers").peekable();

        if specifiers.peek().is_none() {
            self.out.imports.push(ImportRecord {
                module: module.to_string(),
                imported_name: None,
                local_alias: None,
                is_default: false,
                is_namespace: false,
                is_internal,
                line: at,
            });
            return;
        }

        for spec in specifiers {
            let local = ident(spec.get("local")).map(str::to_string);
            let (imported_name, is_default, is_namespace) = match kind(spec) {
                "ImportDefaultSpecifier" => (local.clone(), true, false),
                "ImportNamespaceSpecifier" => (local.clone(), false, true),
                _ => (
                    ident(spec.get("imported")).map(str::to_string),
                    false,
                    false,
                ),
            };
            let local_alias = local.filter(|l| Some(l) != imported_name.as_ref());
            self.out.imports.push(ImportRecord {
                module: module.to_string(),
                imported_name,
                local_alias,
                is_default,
                is_namespace,
                is_internal,
                line: at,
            });
        }
    }

    /// `const x = require('m')` and `const { a, b } = require('m')`.
    fn require(&mut self, declarator: &Value) -> bool {
        let Some(init) = declarator.get("init") else {
            return false;
        };
        if kind(init) != "CallExpression" || ident(init.get("callee")) != Some("require") {
            return false;
        }
        let Some(module) = items(init, "arguments")
            .next()
            .filter(|a| kind(a) == "StringLiteral")
            .and_then(|a| ident(Some(a)))
        else {
            return false;
        };
        let is_internal = self.ctx.is_internal(module);
        let at = line(declarator);
        let Some(id) = declarator.get("id") else {
            return false;
        };

        match kind(id) {
            "Identifier" => self.out.imports.push(ImportRecord {
                module: module.to_string(),
                imported_name: ident(Some(id)).map(str::to_string),
                local_alias: None,
                is_default: true,
                is_namespace: false,
                is_internal,
                line: at,
            }),
            "ObjectPattern" => {
                for prop in items(id, "properties") {
                    let imported = ident(prop.get("key")).map(str::to_string);
                    let local = ident(prop.get("value")).map(str::to_string);
                    self.out.imports.push(ImportRecord {
                        module: module.to_string(),
                        local_alias: local.filter(|l| Some(l) != imported.as_ref()),
                        imported_name: imported,
                        is_default: false,
                        is_namespace: false,
                        is_internal,
                        line: at,
                    });
                }
            }
            _ => return false,
        }
        true
    }

    fn component(&mut self, name: &str, kind: ComponentKind, func: &Value, at: &Value) {
        self.out.components.push(ComponentRecord {
            name: name.to_string(),
            kind,
            props: props_of(func),
            hooks_used: func.get("body").map(hooks_in).unwrap_or_default(),
            is_exported: false,
            line: line(at),
        });
    }

    fn function_declaration(&mut self, node: &Value) -> Option<String> {
        let name = ident(node.get("id"))?.to_string();
        if is_capitalized(&name) {
            self.component(&name, ComponentKind::Function, node, node);
        } else {
            let record = function_record(&name, node, node);
            self.out.functions.push(record);
        }
        Some(name)
    }

    /// Unwrap `memo(...)`, `React.forwardRef(...)` and friends.
    fn wrapped_function<'a>(&self, init: &'a Value) -> Option<&'a Value> {
        match kind(init) {
            "ArrowFunctionExpression" | "FunctionExpression" => Some(init),
            "CallExpression" => {
                let callee = init.get("callee")?;
                let wrapper = match kind(callee) {
                    "Identifier" => ident(Some(callee))?,
                    "MemberExpression" => ident(callee.get("property"))?,
                    _ => return None,
                };
                if !COMPONENT_WRAPPERS.contains(&wrapper) {
                    return None;
                }
                self.wrapped_function(items(init, "arguments").next()?)
            }
            "TSAsExpression" | "TSSatisfiesExpression" | "ParenthesizedExpression" => {
                self.wrapped_function(init.get("expression")?)
            }
            _ => None,
        }
    }

    fn variable_declaration(&mut self, node: &Value) -> Vec<String> {
        let mut names = Vec::new();
        for declarator in items(node, "declarations") {
            if self.require(declarator) {
                continue;
            }
            let Some(name) = ident(declarator.get("id")) else {
                continue;
            };
            names.push(name.to_string());
            let Some(init) = declarator.get("init").filter(|v| !v.is_null()) else {
                continue;
            };
            let Some(func) = self.wrapped_function(init) else {
                continue;
            };
            if is_capitalized(name) {
                let kind = match kind(func) {
                    "ArrowFunctionExpression" => ComponentKind::Arrow,
                    _ => ComponentKind::Function,
                };
                self.component(name, kind, func, declarator);
            } else if is_function_node(func) {
                let record = function_record(name, func, declarator);
                self.out.functions.push(record);
            }
        }
        names
    }

    fn class_declaration(&mut self, node: &Value) -> Option<String> {
        let name = ident(node.get("id"))?.to_string();
        let extends = node
            .get("superClass")
            .filter(|v| !v.is_null())
            .and_then(expr_path);

        let is_component = extends.as_deref().map_or(false, |base| {
            let short = base.rsplit('.').next().unwrap_or(base);
            COMPONENT_BASES.contains(&short)
        });
        if is_component {
            let props = class_props(node);
            self.out.components.push(ComponentRecord {
                name: name.clone(),
                kind: ComponentKind::Class,
                props,
                hooks_used: node.get("body").map(hooks_in).unwrap_or_default(),
                is_exported: false,
                line: line(node),
            });
            return Some(name);
        }

        let implements = items(node, "implements")
            .filter_map(|i| {
                i.get("expression")
                    .or_else(|| i.get("id"))
                    .map(qualified_name)
            })
            .collect();

        let mut methods = Vec::new();
        let mut attributes = Vec::new();
        let members = node.get("body").map(|b| items(b, "body").collect::<Vec<_>>());
        for member in members.unwrap_or_default() {
            match kind(member) {
                "ClassMethod" | "TSDeclareMethod" => {
                    let method_name = ident(member.get("key"));
                    let visibility = visibility_of(member);
                    if member.get("kind").and_then(Value::as_str) == Some("constructor") {
                        attributes.extend(parameter_properties(member));
                        continue;
                    }
                    if let Some(method_name) = method_name {
                        if visibility != Visibility::Private {
                            methods.push(function_record(method_name, member, member));
                        }
                    }
                }
                "ClassProperty" | "ClassPrivateProperty" | "ClassAccessorProperty" => {
                    let Some(attr) = ident(member.get("key")) else {
                        continue;
                    };
                    let visibility = if kind(member) == "ClassPrivateProperty" {
                        Visibility::Private
                    } else {
                        visibility_of(member)
                    };
                    attributes.push(AttributeRecord {
                        name: attr.to_string(),
                        type_annotation: annotation(member),
                        visibility,
                        is_static: flag(member, "static"),
                        line: line(member),
                    });
                }
                _ => {}
            }
        }

        self.out.classes.push(ClassRecord {
            name: name.clone(),
            methods,
            attributes,
            extends,
            implements,
            is_exported: false,
            line: line(node),
        });
        Some(name)
    }

    fn type_decl(&mut self, node: &Value) -> Option<String> {
        let name = ident(node.get("id"))?.to_string();
        let record = TypeDeclRecord {
            name: name.clone(),
            type_parameters: type_parameters(node),
            is_exported: false,
            line: line(node),
        };
        if kind(node) == "TSInterfaceDeclaration" {
            self.out.interfaces.push(record);
        } else {
            self.out.type_aliases.push(record);
        }
        Some(name)
    }

    /// Handle one declaration and return the top-level names it binds.
    fn declaration(&mut self, node: &Value) -> Vec<String> {
        match kind(node) {
            "FunctionDeclaration" | "TSDeclareFunction" => {
                self.function_declaration(node).into_iter().collect()
            }
            "VariableDeclaration" => self.variable_declaration(node),
            "ClassDeclaration" => self.class_declaration(node).into_iter().collect(),
            "TSInterfaceDeclaration" | "TSTypeAliasDeclaration" => {
                self.type_decl(node).into_iter().collect()
            }
            "TSEnumDeclaration" => ident(node.get("id"))
                .map(|n| vec![n.to_string()])
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    fn statement(&mut self, node: &Value) {
        match kind(node) {
            "ImportDeclaration" => self.import(node),
            "ExportNamedDeclaration" => {
                if let Some(decl) = node.get("declaration").filter(|v| !v.is_null()) {
                    let names = self.declaration(decl);
                    self.out.exports.extend(names);
                }
                for spec in items(node, "specifiers") {
                    if let Some(name) = ident(spec.get("exported")) {
                        self.out.exports.push(name.to_string());
                    }
                }
            }
            "ExportDefaultDeclaration" => {
                let Some(decl) = node.get("declaration") else {
                    return;
                };
                match kind(decl) {
                    "Identifier" => {
                        if let Some(name) = ident(Some(decl)) {
                            self.out.exports.push(name.to_string());
                        }
                    }
                    "FunctionDeclaration" | "ClassDeclaration" if decl.get("id").map_or(false, |id| !id.is_null()) => {
                        let names = self.declaration(decl);
                        self.out.exports.extend(names);
                    }
                    _ => {
                        if let Some(func) = self.wrapped_function(decl) {
                            if let Some(name) = func.get("id").and_then(|id| ident(Some(id))) {
                                if is_capitalized(name) {
                                    self.component(name, ComponentKind::Function, func, decl);
                                    self.out.exports.push(name.to_string());
                                    return;
                                }
                            }
                        }
                        self.out.exports.push("default".into());
                    }
                }
            }
            "ExportAllDeclaration" => {
                if let Some(module) = node.pointer("/source/value").and_then(Value::as_str) {
                    self.out.imports.push(ImportRecord {
                        module: module.to_string(),
                        imported_name: Some("*".into()),
                        local_alias: None,
                        is_default: false,
                        is_namespace: true,
                        is_internal: self.ctx.is_internal(module),
                        line: line(node),
                    });
                }
            }
            _ => {
                self.declaration(node);
            }
        }
    }

    /// Record every call site and hook call in the program.
    fn calls(&mut self, program: &Value) {
        let mut bindings: HashMap<*const Value, String> = HashMap::new();
        let mut hook_calls = Vec::new();
        let mut calls = Vec::new();

        walk(program, &mut |node| match kind(node) {
            "VariableDeclarator" => {
                let Some(init) = node.get("init") else { return };
                let init = match kind(init) {
                    "AwaitExpression" => init.get("argument").unwrap_or(init),
                    _ => init,
                };
                if let Some(bound) = node.get("id").and_then(binding_text) {
                    bindings.insert(init as *const Value, bound);
                }
            }
            "CallExpression" | "OptionalCallExpression" => {
                let Some(callee) = node.get("callee") else { return };
                let args: Vec<String> = items(node, "arguments").map(arg_text).collect();
                if let Some(hook) = hook_name_of(callee) {
                    hook_calls.push(HookCallRecord {
                        hook_name: hook.to_string(),
                        args,
                        bound_variable: bindings.get(&(node as *const Value)).cloned(),
                        line: line(node),
                    });
                    return;
                }
                let (callee_name, receiver_name) = match kind(callee) {
                    "Identifier" => (ident(Some(callee)).map(str::to_string), None),
                    "MemberExpression" | "OptionalMemberExpression" => (
                        ident(callee.get("property")).map(str::to_string),
                        callee.get("object").and_then(expr_path),
                    ),
                    _ => (None, None),
                };
                if let Some(callee_name) = callee_name {
                    calls.push(CallRecord {
                        callee_name,
                        receiver_name,
                        args,
                        line: line(node),
                    });
                }
            }
            _ => {}
        });

        self.out.hook_calls = hook_calls;
        self.out.calls = calls;
    }
}

fn visibility_of(member: &Value) -> Visibility {
    if kind(member.get("key").unwrap_or(&Value::Null)) == "PrivateName" {
        return Visibility::Private;
    }
    match member.get("accessibility").and_then(Value::as_str) {
        Some("private") => Visibility::Private,
        Some("protected") => Visibility::Protected,
        _ => Visibility::Public,
    }
}

/// `constructor(private readonly db: Db)` declares an attribute.
fn parameter_properties(ctor: &Value) -> Vec<AttributeRecord> {
    items(ctor, "params")
        .filter(|p| kind(p) == "TSParameterProperty")
        .filter_map(|p| {
            let param = parameter(p.get("parameter")?)?;
            Some(AttributeRecord {
                name: param.name,
                type_annotation: Some(param.type_annotation),
                visibility: visibility_of(p),
                is_static: false,
                line: line(p),
            })
        })
        .collect()
}

/// Props of a class component are read off `this.props.x` accesses.
fn class_props(class: &Value) -> Vec<String> {
    let mut props = Vec::new();
    walk(class, &mut |node| {
        if kind(node) != "MemberExpression" {
            return;
        }
        let Some(object) = node.get("object") else { return };
        if expr_path(object).as_deref() == Some("this.props") {
            if let Some(name) = ident(node.get("property")) {
                props.push(name.to_string());
            }
        }
    });
    props
}

/// Fill `out` from a Babel `Program` node.
pub fn extract(program: &Value, ctx: &AnalysisContext, out: ModuleAnalysis) -> ModuleAnalysis {
    let mut walker = Walker { ctx, out };
    for statement in items(program, "body") {
        walker.statement(statement);
    }
    walker.calls(program);

    let exports = walker.out.exports.clone();
    let exported = |name: &str| exports.iter().any(|e| e == name);
    for f in &mut walker.out.functions {
        f.is_exported = exported(&f.name);
    }
    for c in &mut walker.out.classes {
        c.is_exported = exported(&c.name);
    }
    for c in &mut walker.out.components {
        c.is_exported = exported(&c.name);
    }
    for t in walker
        .out
        .interfaces
        .iter_mut()
        .chain(walker.out.type_aliases.iter_mut())
    {
        t.is_exported = exported(&t.name);
    }
    walker.out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::model::Language;
    use serde_json::json;

    fn loc(line: u64) -> Value {
        json!({ "start": { "line": line } })
    }

    fn id(name: &str) -> Value {
        json!({ "type": "Identifier", "name": name })
    }

    fn run(program: Value) -> ModuleAnalysis {
        let ctx = AnalysisContext::new("/repo");
        let out = ModuleAnalysis::new("src/App.tsx", "src/App", Language::TypeScript);
        extract(&program, &ctx, out)
    }

    fn use_state_call(line_no: u64) -> Value {
        json!({
            "type": "CallExpression",
            "loc": loc(line_no),
            "callee": id("useState"),
            "arguments": [{ "type": "NumericLiteral", "value": 0 }]
        })
    }

    #[test]
    fn test_imports_and_require() {
        let program = json!({
            "type": "Program",
            "body": [
                {
                    "type": "ImportDeclaration",
                    "loc": loc(1),
                    "source": { "type": "StringLiteral", "value": "react" },
                    "specifiers": [
                        { "type": "ImportDefaultSpecifier", "local": id("React") },
                        { "type": "ImportSpecifier", "imported": id("useState"), "local": id("useState") },
                        { "type": "ImportSpecifier", "imported": id("useEffect"), "local": id("useFx") }
                    ]
                },
                {
                    "type": "ImportDeclaration",
                    "loc": loc(2),
                    "source": { "type": "StringLiteral", "value": "./styles.css" },
                    "specifiers": []
                },
                {
                    "type": "VariableDeclaration",
                    "loc": loc(3),
                    "declarations": [{
                        "type": "VariableDeclarator",
                        "loc": loc(3),
                        "id": id("fs"),
                        "init": {
                            "type": "CallExpression",
                            "callee": id("require"),
                            "arguments": [{ "type": "StringLiteral", "value": "fs" }]
                        }
                    }]
                }
            ]
        });

        let analysis = run(program);
        assert_eq!(analysis.imports.len(), 5);
        assert!(analysis.imports[0].is_default);
        assert_eq!(analysis.imports[2].local_alias.as_deref(), Some("useFx"));
        assert_eq!(analysis.imports[2].local_name(), Some("useFx"));
        assert!(analysis.imports[3].imported_name.is_none());
        assert!(analysis.imports[3].is_internal);
        assert_eq!(analysis.imports[4].module, "fs");
        assert!(!analysis.imports[0].is_internal);
    }

    #[test]
    fn test_exported_arrow_component_with_props_and_hooks() {
        let program = json!({
            "type": "Program",
            "body": [{
                "type": "ExportNamedDeclaration",
                "loc": loc(4),
                "declaration": {
                    "type": "VariableDeclaration",
                    "loc": loc(4),
                    "declarations": [{
                        "type": "VariableDeclarator",
                        "loc": loc(4),
                        "id": id("Counter"),
                        "init": {
                            "type": "ArrowFunctionExpression",
                            "params": [{
                                "type": "ObjectPattern",
                                "properties": [
                                    { "type": "ObjectProperty", "key": id("label"), "value": id("label") },
                                    { "type": "ObjectProperty", "key": id("step"), "value": id("step") }
                                ]
                            }],
                            "body": {
                                "type": "BlockStatement",
                                "body": [{
                                    "type": "VariableDeclaration",
                                    "declarations": [{
                                        "type": "VariableDeclarator",
                                        "id": {
                                            "type": "ArrayPattern",
                                            "elements": [id("count"), id("setCount")]
                                        },
                                        "init": use_state_call(5)
                                    }]
                                }]
                            }
                        }
                    }]
                },
                "specifiers": []
            }]
        });

        let analysis = run(program);
        assert_eq!(analysis.components.len(), 1);
        let counter = &analysis.components[0];
        assert_eq!(counter.name, "Counter");
        assert_eq!(counter.kind, ComponentKind::Arrow);
        assert_eq!(counter.props, vec!["label", "step"]);
        assert_eq!(counter.hooks_used, vec!["useState"]);
        assert!(counter.is_exported);
        assert_eq!(counter.line, 4);

        assert_eq!(analysis.hook_calls.len(), 1);
        let hook = &analysis.hook_calls[0];
        assert_eq!(hook.hook_name, "useState");
        assert_eq!(hook.args, vec!["0"]);
        assert_eq!(hook.bound_variable.as_deref(), Some("[count, setCount]"));
        assert_eq!(hook.line, 5);
        assert!(analysis.functions.is_empty());
    }

    #[test]
    fn test_typed_function_and_member_calls() {
        let program = json!({
            "type": "Program",
            "body": [{
                "type": "FunctionDeclaration",
                "loc": loc(1),
                "id": id("loadUser"),
                "async": true,
                "params": [
                    {
                        "type": "Identifier",
                        "name": "id",
                        "typeAnnotation": {
                            "type": "TSTypeAnnotation",
                            "typeAnnotation": { "type": "TSStringKeyword" }
                        }
                    },
                    {
                        "type": "AssignmentPattern",
                        "left": id("retries"),
                        "right": { "type": "NumericLiteral", "value": 3 }
                    }
                ],
                "returnType": {
                    "type": "TSTypeAnnotation",
                    "typeAnnotation": {
                        "type": "TSTypeReference",
                        "typeName": id("Promise"),
                        "typeParameters": {
                            "type": "TSTypeParameterInstantiation",
                            "params": [{
                                "type": "TSUnionType",
                                "types": [
                                    { "type": "TSTypeReference", "typeName": id("User") },
                                    { "type": "TSNullKeyword" }
                                ]
                            }]
                        }
                    }
                },
                "body": {
                    "type": "BlockStatement",
                    "body": [{
                        "type": "ExpressionStatement",
                        "expression": {
                            "type": "CallExpression",
                            "loc": loc(2),
                            "callee": {
                                "type": "MemberExpression",
                                "object": id("supabase"),
                                "property": id("rpc"),
                                "computed": false
                            },
                            "arguments": [
                                { "type": "StringLiteral", "value": "get_user" },
                                { "type": "ObjectExpression", "properties": [] }
                            ]
                        }
                    }]
                }
            }]
        });

        let analysis = run(program);
        let f = &analysis.functions[0];
        assert_eq!(f.name, "loadUser");
        assert!(f.is_async);
        assert!(!f.is_exported);
        assert_eq!(f.return_type.as_deref(), Some("Promise<User | null>"));
        assert_eq!(f.parameters[0].signature(), "id: string");
        assert_eq!(f.parameters[1].default.as_deref(), Some("3"));
        assert!(f.parameters[1].optional);

        let call = &analysis.calls[0];
        assert_eq!(call.callee_name, "rpc");
        assert_eq!(call.receiver_name.as_deref(), Some("supabase"));
        assert_eq!(call.args, vec!["get_user", "{}"]);
    }

    #[test]
    fn test_class_members_and_interfaces() {
        let program = json!({
            "type": "Program",
            "body": [
                {
                    "type": "ExportNamedDeclaration",
                    "declaration": {
                        "type": "TSInterfaceDeclaration",
                        "loc": loc(1),
                        "id": id("Repo"),
                        "typeParameters": {
                            "type": "TSTypeParameterDeclaration",
                            "params": [{ "type": "TSTypeParameter", "name": "T" }]
                        }
                    },
                    "specifiers": []
                },
                {
                    "type": "ClassDeclaration",
                    "loc": loc(3),
                    "id": id("UserRepo"),
                    "superClass": id("BaseRepo"),
                    "implements": [{ "type": "TSExpressionWithTypeArguments", "expression": id("Repo") }],
                    "body": {
                        "type": "ClassBody",
                        "body": [
                            {
                                "type": "ClassProperty",
                                "loc": loc(4),
                                "key": id("table"),
                                "static": true,
                                "typeAnnotation": {
                                    "type": "TSTypeAnnotation",
                                    "typeAnnotation": { "type": "TSStringKeyword" }
                                }
                            },
                            {
                                "type": "ClassMethod",
                                "loc": loc(5),
                                "kind": "constructor",
                                "key": id("constructor"),
                                "params": [{
                                    "type": "TSParameterProperty",
                                    "accessibility": "private",
                                    "parameter": id("db")
                                }]
                            },
                            {
                                "type": "ClassMethod",
                                "loc": loc(6),
                                "kind": "method",
                                "key": id("find"),
                                "params": [id("id")]
                            },
                            {
                                "type": "ClassMethod",
                                "loc": loc(7),
                                "kind": "method",
                                "accessibility": "private",
                                "key": id("cache"),
                                "params": []
                            }
                        ]
                    }
                }
            ]
        });

        let analysis = run(program);
        assert_eq!(analysis.interfaces[0].name, "Repo");
        assert_eq!(analysis.interfaces[0].type_parameters.as_deref(), Some("<T>"));
        assert!(analysis.interfaces[0].is_exported);

        let class = &analysis.classes[0];
        assert_eq!(class.extends.as_deref(), Some("BaseRepo"));
        assert_eq!(class.implements, vec!["Repo"]);
        assert_eq!(class.methods.len(), 1);
        assert_eq!(class.methods[0].name, "find");
        let names: Vec<&str> = class.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["table", "db"]);
        assert!(class.attributes[0].is_static);
        assert_eq!(class.attributes[1].visibility, Visibility::Private);
    }

    #[test]
    fn test_class_component_and_default_export() {
        let program = json!({
            "type": "Program",
            "body": [
                {
                    "type": "ClassDeclaration",
                    "loc": loc(2),
                    "id": id("Legacy"),
                    "superClass": {
                        "type": "MemberExpression",
                        "object": id("React"),
                        "property": id("Component"),
                        "computed": false
                    },
                    "body": {
                        "type": "ClassBody",
                        "body": [{
                            "type": "ClassMethod",
                            "kind": "method",
                            "key": id("render"),
                            "params": [],
                            "body": {
                                "type": "BlockStatement",
                                "body": [{
                                    "type": "ReturnStatement",
                                    "argument": {
                                        "type": "MemberExpression",
                                        "object": {
                                            "type": "MemberExpression",
                                            "object": { "type": "ThisExpression" },
                                            "property": id("props"),
                                            "computed": false
                                        },
                                        "property": id("title"),
                                        "computed": false
                                    }
                                }]
                            }
                        }]
                    }
                },
                {
                    "type": "ExportDefaultDeclaration",
                    "declaration": id("Legacy")
                }
            ]
        });

        let analysis = run(program);
        assert!(analysis.classes.is_empty());
        let legacy = &analysis.components[0];
        assert_eq!(legacy.kind, ComponentKind::Class);
        assert_eq!(legacy.props, vec!["title"]);
        assert!(legacy.is_exported);
    }

    #[test]
    fn test_type_text_shapes() {
        let array_of_union = json!({
            "type": "TSArrayType",
            "elementType": {
                "type": "TSUnionType",
                "types": [{ "type": "TSStringKeyword" }, { "type": "TSNumberKeyword" }]
            }
        });
        assert_eq!(type_text(&array_of_union), "(string | number)[]");

        let literal = json!({
            "type": "TSLiteralType",
            "literal": { "type": "StringLiteral", "value": "admin" }
        });
        assert_eq!(type_text(&literal), "'admin'");

        let qualified = json!({
            "type": "TSTypeReference",
            "typeName": { "type": "TSQualifiedName", "left": id("React"), "right": id("FC") }
        });
        assert_eq!(type_text(&qualified), "React.FC");
    }
}
