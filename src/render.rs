//! HTML fragments for embedding the membership screens in an admin page.

use crate::forms::FormOutcome;
use crate::models::Client;

/// Admin page that would edit a client. No handler exists for it yet.
const UPDATE_CLIENT_PAGE: &str = "admin.php?page=cmp_update_client";

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#039;")
}

/// Success or error banner for a submitted form
pub fn notice(outcome: &FormOutcome) -> String {
    let class = if outcome.is_success() { "updated" } else { "error" };
    format!(
        "<div class=\"{}\"><p>{}</p></div>",
        class,
        escape_html(&outcome.message())
    )
}

/// Table of all clients with an Update link per row
pub fn clients_table(clients: &[Client]) -> String {
    if clients.is_empty() {
        return "<p>No clients found.</p>".to_string();
    }

    let mut out = String::new();
    out.push_str("<table class=\"table-responsive\">");
    out.push_str("<thead><tr><th>Client Name</th><th>Email</th><th>Actions</th></tr></thead>");
    out.push_str("<tbody>");

    for client in clients {
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td><a href=\"{}&amp;client_id={}\">Update</a></td></tr>",
            escape_html(&client.name),
            escape_html(&client.email),
            UPDATE_CLIENT_PAGE,
            client.id,
        ));
    }

    out.push_str("</tbody>");
    out.push_str("</table>");
    out
}

/// Client dropdown for the add-person form
pub fn client_options(clients: &[Client]) -> String {
    let mut out = String::new();
    out.push_str("<select name=\"cmp_client\" id=\"cmp_client\" required>");
    out.push_str("<option value=\"\">Select Client</option>");

    for client in clients {
        out.push_str(&format!(
            "<option value=\"{}\">{}</option>",
            client.id,
            escape_html(&client.name)
        ));
    }

    out.push_str("</select>");
    out
}
