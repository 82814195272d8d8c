use std::{borrow::Cow, fmt::Write as _};

use armory_dal::gun::Gun;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

const STYLE: &str = "body{font-family:sans-serif;margin:2em}table{border-collapse:collapse}\
td,th{border:1px solid #ccc;padding:.3em .6em}label{display:block;margin-top:.6em}";

pub fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut escaped = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

fn opt_text(value: Option<&str>) -> Cow<'_, str> {
    value.map(escape).unwrap_or_default()
}

fn opt_number<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn timestamp(ts: &OffsetDateTime) -> String {
    ts.format(&Rfc3339).unwrap_or_default()
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title>\
         <style>{STYLE}</style></head><body>\n{body}\n</body></html>\n",
        title = escape(title),
    )
}

pub fn list_page(guns: &[Gun], query: &str, total_value: f64) -> String {
    let mut body = String::new();
    let _ = write!(
        body,
        "<h1>Antique Firearms</h1>\
         <form method=\"get\" action=\"/guns\"><input type=\"search\" name=\"q\" value=\"{q}\" \
         placeholder=\"Search\"> <button type=\"submit\">Search</button></form>\
         <p><a href=\"/guns/new\">Add gun</a></p>\
         <p>Count: <strong id=\"count\">{count}</strong>, \
         total value: <strong id=\"total-value\">{total_value:.2}</strong></p>",
        q = escape(query),
        count = guns.len(),
    );
    body.push_str(
        "<table><thead><tr><th>ID</th><th>Name</th><th>Year</th><th>Condition</th>\
         <th>Serial number</th><th>Value</th><th></th></tr></thead><tbody>",
    );
    for gun in guns {
        let _ = write!(
            body,
            "<tr><td>{id}</td><td><a href=\"/guns/{id}\">{name}</a></td><td>{year}</td>\
             <td>{condition}</td><td>{serial}</td><td>{value}</td>\
             <td><a href=\"/guns/{id}/edit\">Edit</a></td></tr>",
            id = gun.id,
            name = escape(&gun.gun_name),
            year = opt_number(gun.year),
            condition = opt_number(gun.condition),
            serial = opt_text(gun.serial_number.as_deref()),
            value = gun.value.map(|v| format!("{v:.2}")).unwrap_or_default(),
        );
    }
    body.push_str("</tbody></table>");
    layout("Guns", &body)
}

pub fn detail_page(gun: &Gun) -> String {
    let mut body = String::new();
    let _ = write!(
        body,
        "<h1>{name}</h1><dl>\
         <dt>Year</dt><dd>{year}</dd>\
         <dt>Condition</dt><dd>{condition}</dd>\
         <dt>Serial number</dt><dd>{serial}</dd>\
         <dt>Description</dt><dd>{description}</dd>\
         <dt>Attachments</dt><dd>{attachments}</dd>\
         <dt>Value</dt><dd>{value}</dd>\
         <dt>Created</dt><dd>{created}</dd>\
         <dt>Updated</dt><dd>{updated}</dd></dl>",
        name = escape(&gun.gun_name),
        year = opt_number(gun.year),
        condition = opt_number(gun.condition),
        serial = opt_text(gun.serial_number.as_deref()),
        description = opt_text(gun.description.as_deref()),
        attachments = opt_text(gun.misc_attachments.as_deref()),
        value = gun.value.map(|v| format!("{v:.2}")).unwrap_or_default(),
        created = timestamp(&gun.created_at),
        updated = timestamp(&gun.updated_at),
    );
    if gun.has_image() {
        let _ = write!(
            body,
            "<p><img src=\"/guns/{id}/image\" alt=\"{name}\" style=\"max-width:40em\"></p>",
            id = gun.id,
            name = escape(&gun.gun_name),
        );
    }
    let _ = write!(
        body,
        "<p><a href=\"/guns/{id}/edit\">Edit</a> | <a href=\"/guns\">Back to list</a></p>\
         <form method=\"post\" action=\"/guns/{id}/delete\"><button type=\"submit\">Delete</button></form>",
        id = gun.id,
    );
    layout(&gun.gun_name, &body)
}

fn field_text<'a>(gun: Option<&'a Gun>, f: impl Fn(&'a Gun) -> Option<&'a str>) -> Cow<'a, str> {
    opt_text(gun.and_then(f))
}

fn input(label: &str, name: &str, kind: &str, value: &str) -> String {
    format!(
        "<label for=\"{name}\">{label}</label>\
         <input type=\"{kind}\" id=\"{name}\" name=\"{name}\" value=\"{value}\">"
    )
}

/// Empty form for new gun or populated form for editing
pub fn form_page(gun: Option<&Gun>) -> String {
    let (title, action) = match gun {
        Some(gun) => ("Edit gun".to_string(), format!("/guns/{}", gun.id)),
        None => ("New gun".to_string(), "/guns".to_string()),
    };

    let mut body = String::new();
    let _ = write!(
        body,
        "<h1>{title}</h1><form method=\"post\" action=\"{action}\" enctype=\"multipart/form-data\">"
    );
    body.push_str(&input(
        "Name",
        "gun_name",
        "text",
        &field_text(gun, |g| Some(g.gun_name.as_str())),
    ));
    body.push_str(&input(
        "Year",
        "year",
        "number",
        &opt_number(gun.and_then(|g| g.year)),
    ));
    body.push_str(&input(
        "Condition",
        "condition",
        "number",
        &opt_number(gun.and_then(|g| g.condition)),
    ));
    body.push_str(&input(
        "Serial number",
        "serial_number",
        "text",
        &field_text(gun, |g| g.serial_number.as_deref()),
    ));
    body.push_str(&input(
        "Description",
        "description",
        "text",
        &field_text(gun, |g| g.description.as_deref()),
    ));
    body.push_str(&input(
        "Attachments",
        "misc_attachments",
        "text",
        &field_text(gun, |g| g.misc_attachments.as_deref()),
    ));
    body.push_str(&input(
        "Value",
        "value",
        "text",
        &opt_number(gun.and_then(|g| g.value)),
    ));
    body.push_str(
        "<label for=\"image\">Image</label><input type=\"file\" id=\"image\" name=\"image\" accept=\"image/*\">\
         <p><button type=\"submit\">Save</button> <a href=\"/guns\">Cancel</a></p></form>",
    );
    layout(&title, &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gun(name: &str) -> Gun {
        let now = OffsetDateTime::now_utc();
        Gun {
            id: 7,
            gun_name: name.to_string(),
            year: Some(1873),
            condition: None,
            serial_number: None,
            description: Some("Single <action>".to_string()),
            image: None,
            misc_attachments: None,
            value: Some(100.5),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("Colt 1911"), "Colt 1911");
        assert_eq!(
            escape(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_list_page() {
        let page = list_page(&[gun("Colt <SAA>")], "co\"lt", 100.5);
        assert!(page.contains("Colt &lt;SAA&gt;"));
        assert!(page.contains("value=\"co&quot;lt\""));
        assert!(page.contains("<strong id=\"count\">1</strong>"));
        assert!(page.contains("<strong id=\"total-value\">100.50</strong>"));
    }

    #[test]
    fn test_form_page() {
        let page = form_page(None);
        assert!(page.contains("action=\"/guns\""));
        let g = gun("Peacemaker");
        let page = form_page(Some(&g));
        assert!(page.contains("action=\"/guns/7\""));
        assert!(page.contains("value=\"Peacemaker\""));
        assert!(page.contains("value=\"1873\""));
        assert!(page.contains("value=\"Single &lt;action&gt;\""));
    }

    #[test]
    fn test_detail_page_image() {
        let mut g = gun("Peacemaker");
        assert!(!detail_page(&g).contains("/guns/7/image"));
        g.image = Some(vec![1]);
        assert!(detail_page(&g).contains("/guns/7/image"));
    }
}
