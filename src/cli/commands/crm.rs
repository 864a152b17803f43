use serde::{Deserialize, Serialize};
use tabled::{Table, Tabled};

use crate::cli::api_client::ApiClient;
use crate::cli::error::CliResult;
use crate::cli::utils::{apply_table_style, or_dash, truncate_with_ellipsis};

#[derive(Debug, Serialize, Deserialize)]
struct ListClientsResponse {
    items: Vec<Client>,
    total: usize,
    limit: usize,
    offset: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    #[serde(default)]
    pub tag_ids: Vec<String>,
}

#[derive(Tabled)]
struct ClientDisplay {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Company")]
    company: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Phone")]
    phone: String,
    #[tabled(rename = "Tags")]
    tags: usize,
}

impl From<&Client> for ClientDisplay {
    fn from(client: &Client) -> Self {
        Self {
            id: client.id.clone(),
            name: truncate_with_ellipsis(&client.name, 40),
            company: or_dash(client.company.as_deref()),
            email: or_dash(client.email.as_deref()),
            phone: or_dash(client.phone.as_deref()),
            tags: client.tag_ids.len(),
        }
    }
}

/// List CRM clients, optionally searching or filtering by tag id
pub async fn list_clients(
    api_client: &ApiClient,
    query: Option<&str>,
    tag: Option<&str>,
    format: &str,
) -> CliResult<String> {
    let mut request = api_client.get("/api/v1/crm/clients")?;
    if let Some(q) = query {
        request = request.query(&[("q", q)]);
    }
    if let Some(t) = tag {
        request = request.query(&[("tag_id", t)]);
    }

    let response: ListClientsResponse = ApiClient::handle_response(request.send().await?).await?;

    match format {
        "json" => Ok(serde_json::to_string_pretty(&response.items)?),
        _ => Ok(format_table(&response.items)),
    }
}

fn format_table(clients: &[Client]) -> String {
    if clients.is_empty() {
        return "No clients found.".to_string();
    }

    let rows: Vec<ClientDisplay> = clients.iter().map(|c| c.into()).collect();
    let mut table = Table::new(rows);
    apply_table_style(&mut table);
    table.to_string()
}
