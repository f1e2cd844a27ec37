//! Plain-text markup for view snapshots.

use remote_view_runtime::View;
use remote_view_runtime::attributes::ElementProps;
use remote_view_runtime::serde_json::Value;
use std::fmt::Write;

const INDENT: &str = "  ";

pub fn markup(view: &View) -> String {
    let mut out = String::new();
    write_view(&mut out, view, 0);
    out
}

fn write_view(out: &mut String, view: &View, depth: usize) {
    let pad = INDENT.repeat(depth);
    match view {
        View::Empty => {}
        View::Text(text) => {
            for line in text.lines() {
                let _ = writeln!(out, "{pad}{line}");
            }
        }
        View::Error(message) => {
            let _ = writeln!(out, "{pad}!! {message}");
        }
        View::Group(children) => {
            for child in children {
                write_view(out, child, depth);
            }
        }
        View::Element {
            tag,
            key,
            props,
            children,
        } => {
            let _ = write!(out, "{pad}<{tag}");
            if let Some(key) = key {
                let _ = write!(out, " key=\"{key}\"");
            }
            write_props(out, props);
            if children.is_empty() {
                let _ = writeln!(out, "/>");
                return;
            }
            let _ = writeln!(out, ">");
            for child in children {
                write_view(out, child, depth + 1);
            }
            let _ = writeln!(out, "{pad}</{tag}>");
        }
        View::Container { instance, content } => {
            let _ = writeln!(out, "{pad}[{instance}]");
            if let Some(content) = content {
                write_view(out, content, depth + 1);
            }
        }
    }
}

fn write_props(out: &mut String, props: &ElementProps) {
    for (name, value) in &props.attributes {
        match value {
            Value::String(text) => {
                let _ = write!(out, " {name}=\"{text}\"");
            }
            other => {
                let _ = write!(out, " {name}={other}");
            }
        }
    }
    for event in &props.events {
        let _ = write!(out, " {}=>{}", event.name, event.target);
    }
}
