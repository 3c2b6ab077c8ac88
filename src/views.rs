//! Server-rendered pages: signup, login and the pin list.

use crate::models::{Attachment, Pin};

/// Error codes shown on the login and signup forms.
pub const E_BAD_FORM: &str = "E_BAD_FORM";
pub const E_ENTITY_DOES_NOT_EXIST: &str = "E_ENTITY_DOES_NOT_EXIST";
pub const E_INCORRECT_PASSWORD: &str = "E_INCORRECT_PASSWORD";

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn error_message(code: &str) -> &'static str {
    match code {
        E_BAD_FORM => "Username and password are required.",
        E_ENTITY_DOES_NOT_EXIST => "No account exists with that username.",
        E_INCORRECT_PASSWORD => "Incorrect password.",
        _ => "Something went wrong.",
    }
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{} | pins4days</title></head>\n<body>\n{}\n</body>\n</html>\n",
        escape_html(title),
        body
    )
}

fn credentials_form(action: &str, submit: &str, error: Option<&str>) -> String {
    let error = error
        .map(|code| format!("<p class=\"error\" data-code=\"{code}\">{}</p>\n", error_message(code)))
        .unwrap_or_default();
    format!(
        "{error}<form method=\"post\" action=\"{action}\">\n\
         <label>Username <input name=\"username\" autocomplete=\"username\"></label>\n\
         <label>Password <input name=\"password\" type=\"password\"></label>\n\
         <button type=\"submit\">{submit}</button>\n</form>"
    )
}

pub fn login_page(error: Option<&str>) -> String {
    let body = format!(
        "<h1>Log in</h1>\n{}\n<p><a href=\"/signup\">Create an account</a></p>",
        credentials_form("/login", "Log in", error)
    );
    layout("Log in", &body)
}

pub fn signup_page(error: Option<&str>) -> String {
    let body = format!(
        "<h1>Sign up</h1>\n{}\n<p><a href=\"/login\">Already have an account?</a></p>",
        credentials_form("/signup", "Sign up", error)
    );
    layout("Sign up", &body)
}

fn attachment_html(a: &Attachment) -> String {
    let mut out = String::from("<div class=\"attachment\">");
    if let Some(img) = &a.image_url {
        out.push_str(&format!("<img src=\"{}\" alt=\"\">", escape_html(img)));
    }
    if let Some(text) = &a.text {
        out.push_str(&format!("<p>{}</p>", escape_html(text)));
    }
    if let Some(url) = a.original_url.as_ref().or(a.from_url.as_ref()) {
        out.push_str(&format!("<a href=\"{0}\">{0}</a>", escape_html(url)));
    }
    out.push_str("</div>");
    out
}

pub fn pins_page(username: &str, pins: &[Pin]) -> String {
    let mut body = format!(
        "<h1>Pins</h1>\n<div>Logged in as {}. <form method=\"post\" action=\"/logout\"><button>Log out</button></form></div>\n",
        escape_html(username)
    );
    if pins.is_empty() {
        body.push_str("<p>No pins yet.</p>");
    }
    body.push_str("<ul class=\"pins\">\n");
    for pin in pins {
        body.push_str(&format!(
            "<li id=\"{}\" data-created=\"{}\"><blockquote>{}</blockquote><small>by {} in {}, pinned by {}</small>",
            escape_html(&pin.key),
            pin.created_ts,
            escape_html(&pin.text),
            escape_html(&pin.author_id),
            escape_html(&pin.channel_id),
            escape_html(&pin.pinner_id),
        ));
        for a in &pin.attachments {
            body.push_str(&attachment_html(a));
        }
        body.push_str("</li>\n");
    }
    body.push_str("</ul>");
    layout("Pins", &body)
}
