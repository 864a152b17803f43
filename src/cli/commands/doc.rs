use serde::{Deserialize, Serialize};
use tabled::{Table, Tabled};

use crate::cli::api_client::ApiClient;
use crate::cli::error::CliResult;
use crate::cli::utils::{apply_table_style, or_dash, truncate_with_ellipsis};

#[derive(Debug, Serialize, Deserialize)]
struct ListDocumentsResponse {
    items: Vec<Document>,
    total: usize,
    limit: usize,
    offset: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub icon: Option<String>,
    pub project_id: Option<String>,
    pub parent_id: Option<String>,
    pub version: i64,
    pub updated_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TreeNode {
    pub id: String,
    pub title: String,
    pub icon: Option<String>,
    #[serde(default)]
    pub children: Vec<TreeNode>,
}

#[derive(Tabled)]
struct DocumentDisplay {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Parent")]
    parent: String,
    #[tabled(rename = "Version")]
    version: i64,
    #[tabled(rename = "Updated")]
    updated_at: String,
}

impl From<&Document> for DocumentDisplay {
    fn from(doc: &Document) -> Self {
        let title = match &doc.icon {
            Some(icon) => format!("{} {}", icon, doc.title),
            None => doc.title.clone(),
        };
        Self {
            id: doc.id.clone(),
            title: truncate_with_ellipsis(&title, 50),
            parent: or_dash(doc.parent_id.as_deref()),
            version: doc.version,
            updated_at: doc.updated_at.clone(),
        }
    }
}

/// List documents, optionally under one project or parent (`root` for top level)
pub async fn list_documents(
    api_client: &ApiClient,
    project: Option<&str>,
    parent: Option<&str>,
    format: &str,
) -> CliResult<String> {
    let mut request = api_client.get("/api/v1/documents")?;
    if let Some(p) = project {
        request = request.query(&[("project_id", p)]);
    }
    if let Some(p) = parent {
        request = request.query(&[("parent_id", p)]);
    }

    let response: ListDocumentsResponse =
        ApiClient::handle_response(request.send().await?).await?;

    match format {
        "json" => Ok(serde_json::to_string_pretty(&response.items)?),
        _ => Ok(format_table(&response.items)),
    }
}

fn format_table(documents: &[Document]) -> String {
    if documents.is_empty() {
        return "No documents found.".to_string();
    }

    let rows: Vec<DocumentDisplay> = documents.iter().map(|d| d.into()).collect();
    let mut table = Table::new(rows);
    apply_table_style(&mut table);
    table.to_string()
}

/// Print the page tree, one indented line per document
pub async fn show_tree(api_client: &ApiClient, project: Option<&str>) -> CliResult<String> {
    let mut request = api_client.get("/api/v1/documents/tree")?;
    if let Some(p) = project {
        request = request.query(&[("project_id", p)]);
    }

    let roots: Vec<TreeNode> = ApiClient::handle_response(request.send().await?).await?;
    Ok(render_tree(&roots))
}

pub(crate) fn render_tree(roots: &[TreeNode]) -> String {
    if roots.is_empty() {
        return "No documents found.".to_string();
    }

    let mut lines = Vec::new();
    for node in roots {
        push_node(node, 0, &mut lines);
    }
    lines.join("\n")
}

fn push_node(node: &TreeNode, depth: usize, lines: &mut Vec<String>) {
    let icon = node
        .icon
        .as_deref()
        .map(|i| format!("{} ", i))
        .unwrap_or_default();
    lines.push(format!(
        "{}{}{}  [{}]",
        "  ".repeat(depth),
        icon,
        node.title,
        node.id
    ));
    for child in &node.children {
        push_node(child, depth + 1, lines);
    }
}
