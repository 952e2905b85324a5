//! Built-in demo tools for `conductor run`.

use conductor_core::error::ToolError;
use conductor_core::schema::Param;
use conductor_core::tool::{FnTool, ToolSource, Toolbox};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

/// Named notes kept for the lifetime of one agent.
#[derive(Debug, Default)]
pub struct Notebook {
    notes: Mutex<BTreeMap<String, String>>,
}

impl Notebook {
    fn notes(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.notes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn notebook() -> Toolbox<Notebook> {
    Toolbox::new(Notebook::default())
        .method("write_note", |book: &Notebook, args| {
            let title = args.str("title")?;
            let body = args.str("body")?;
            let replaced = book.notes().insert(title.clone(), body).is_some();
            Ok(json!({ "title": title, "replaced": replaced }))
        })
        .describe("Store a note under a title, replacing any existing note")
        .param(Param::string("title"))
        .param(Param::string("body"))
        .method("read_note", |book: &Notebook, args| {
            let title = args.str("title")?;
            book.notes()
                .get(&title)
                .map(|body| json!(body))
                .ok_or_else(|| ToolError::failed("read_note", format!("no note titled '{title}'")))
        })
        .describe("Read a note by title")
        .param(Param::string("title"))
        .method("list_notes", |book: &Notebook, _| {
            Ok(json!(book.notes().keys().cloned().collect::<Vec<_>>()))
        })
        .describe("List note titles")
        .method("delete_note", |book: &Notebook, args| {
            let title = args.str("title")?;
            Ok(json!(book.notes().remove(&title).is_some()))
        })
        .describe("Delete a note by title")
        .param(Param::string("title"))
        .with_breakpoint()
}

/// Every demo tool: arithmetic, echo, a slow lookup and a notebook.
pub fn demo_tools() -> ToolSource {
    ToolSource::List(vec![
        FnTool::sync("add", |args| Ok(json!(args.f64("a")? + args.f64("b")?)))
            .describe("Add two numbers")
            .params([Param::number("a"), Param::number("b")])
            .into(),
        FnTool::sync("multiply", |args| Ok(json!(args.f64("a")? * args.f64("b")?)))
            .describe("Multiply two numbers")
            .params([Param::number("a"), Param::number("b")])
            .into(),
        FnTool::sync("echo", |args| {
            let text = args.str("text")?;
            let times = args.i64("times")?.clamp(1, 10) as usize;
            Ok(json!(vec![text; times].join(" ")))
        })
        .describe("Repeat some text")
        .param(Param::new("text"))
        .param(Param::integer("times").default(1))
        .into(),
        FnTool::new("lookup", |args| async move {
            let key = args.str("key")?;
            let delay = args.i64("delay_ms")?.clamp(0, 10_000) as u64;
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok::<_, ToolError>(json!({ "key": key, "found": false }))
        })
        .describe("Simulated slow lookup")
        .param(Param::string("key"))
        .param(Param::integer("delay_ms").default(250))
        .into(),
        notebook().into(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_core::tool::{Tool, ToolRegistry};
    use serde_json::{Map, Value};

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(demo_tools());
        registry
    }

    #[test]
    fn registers_every_demo_tool() {
        let registry = registry();
        assert_eq!(
            registry.names(),
            vec![
                "add",
                "multiply",
                "echo",
                "lookup",
                "write_note",
                "read_note",
                "list_notes",
                "delete_note"
            ]
        );
        assert!(registry.get("delete_note").unwrap().breakpoint());
        assert!(!registry.get("write_note").unwrap().breakpoint());
    }

    #[tokio::test]
    async fn notebook_methods_share_state() {
        let registry = registry();
        let write = registry.get("write_note").unwrap();
        let read = registry.get("read_note").unwrap();

        write
            .execute(args(json!({"title": "todo", "body": "ship it"})))
            .await
            .unwrap();
        let body = read.execute(args(json!({"title": "todo"}))).await.unwrap();
        assert_eq!(body, json!("ship it"));

        assert!(read.execute(args(json!({"title": "nope"}))).await.is_err());
    }

    #[tokio::test]
    async fn echo_uses_default_repeat() {
        let echo = registry().get("echo").unwrap();
        let out = echo.execute(args(json!({"text": "hi"}))).await.unwrap();
        assert_eq!(out, json!("hi"));
    }
}
