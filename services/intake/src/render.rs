//! HTML rendering of the intake form.
//!
//! Required fields and the email shape are enforced by the browser through
//! input constraints; nothing here validates values.

use crate::form::{IntakeForm, Notification};
use crate::ticket::{Device, TicketField};
use std::fmt::Write;

const SUBMIT_LABEL: &str = "Submit";
const SUBMITTING_LABEL: &str = "Sending...";

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; background: #f4f5f7; margin: 0; }
.container { display: flex; justify-content: center; padding: 2rem 1rem; }
.repair-form { background: #fff; border-radius: 8px; padding: 2rem; width: 100%; max-width: 420px; box-shadow: 0 2px 8px rgba(0,0,0,.08); }
.form-group { display: flex; flex-direction: column; margin-bottom: 1rem; }
.form-group label { font-weight: 600; margin-bottom: .25rem; }
.input { padding: .5rem; border: 1px solid #ccc; border-radius: 4px; font-size: 1rem; }
.preview-img { max-width: 100%; max-height: 240px; border-radius: 4px; margin-bottom: 1rem; }
.submit-btn { width: 100%; padding: .75rem; font-size: 1rem; border: 0; border-radius: 4px; background: #2563eb; color: #fff; cursor: pointer; }
.submit-btn:disabled { background: #93a8d8; cursor: default; }
.notice { padding: .75rem; border-radius: 4px; margin-bottom: 1rem; }
.notice.success { background: #e7f6ec; color: #14532d; }
.notice.error { background: #fdecec; color: #7f1d1d; }
"#;

// Client-side preview and submission. The form is posted with fetch so the
// selected file survives a failed attempt; it is reset only on a 2xx reply.
const SCRIPT: &str = r#"
(function () {
  var form = document.getElementById("repair-form");
  var input = document.getElementById("photo");
  var preview = document.getElementById("preview");
  var button = document.getElementById("submit");
  function clearPreview() { preview.hidden = true; preview.innerHTML = ""; }
  function showNotice(message, ok) {
    var notice = document.getElementById("notice");
    if (!notice) {
      notice = document.createElement("div");
      notice.id = "notice";
      notice.setAttribute("role", "alert");
      form.insertBefore(notice, form.querySelector(".form-group"));
    }
    notice.className = "notice " + (ok ? "success" : "error");
    notice.textContent = message;
    window.alert(message);
  }
  input.addEventListener("change", function () {
    var file = input.files[0];
    if (!file) { clearPreview(); return; }
    var reader = new FileReader();
    reader.onloadend = function () {
      preview.innerHTML = '<img class="preview-img" alt="Preview">';
      preview.firstChild.src = reader.result;
      preview.hidden = false;
    };
    reader.readAsDataURL(file);
  });
  form.addEventListener("submit", function (event) {
    event.preventDefault();
    button.disabled = true;
    button.textContent = button.dataset.busyLabel;
    fetch(form.action, { method: "POST", body: new FormData(form) })
      .then(function (response) {
        return response.text().then(function (html) {
          var page = new DOMParser().parseFromString(html, "text/html");
          var notice = page.getElementById("notice");
          showNotice(notice ? notice.textContent : html, response.ok);
          if (response.ok) { form.reset(); clearPreview(); }
        });
      })
      .catch(function (err) { showNotice(String(err), false); })
      .then(function () {
        button.disabled = false;
        button.textContent = button.dataset.idleLabel;
      });
  });
})();
"#;

/// Render the full form page, with an optional notification banner
pub fn render_page(form: &IntakeForm, notification: Option<&Notification>) -> String {
    let mut html = String::with_capacity(4096);

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str("<title>Repair Request</title>\n");
    let _ = write!(html, "<style>{STYLE}</style>\n</head>\n<body>\n");
    html.push_str("<div class=\"container\">\n");
    html.push_str(
        "<form class=\"repair-form\" id=\"repair-form\" method=\"post\" action=\"/tickets\" enctype=\"multipart/form-data\">\n",
    );
    html.push_str("<h2>Repair Request</h2>\n");

    if let Some(notification) = notification {
        let class = if notification.is_success() { "success" } else { "error" };
        let _ = writeln!(
            html,
            "<div class=\"notice {class}\" id=\"notice\" role=\"alert\">{}</div>",
            escape_html(&notification.to_string())
        );
    }

    text_input(&mut html, form, TicketField::Name, "Name", "text", "name");
    text_input(&mut html, form, TicketField::Email, "Email", "email", "email");
    text_input(&mut html, form, TicketField::Phone, "Phone number", "tel", "tel");
    device_select(&mut html, form.field(TicketField::Device));

    html.push_str("<div class=\"form-group\">\n<label for=\"photo\">Upload photo:</label>\n");
    html.push_str(
        "<input class=\"input\" type=\"file\" name=\"photo\" id=\"photo\" accept=\"image/*\">\n</div>\n",
    );

    // File inputs cannot be pre-filled, so a server-rendered page never
    // previews a photo the next post would not carry.
    html.push_str("<div class=\"preview\" id=\"preview\" hidden></div>\n");

    let (disabled, label) = if form.is_submitting() {
        (" disabled", SUBMITTING_LABEL)
    } else {
        ("", SUBMIT_LABEL)
    };
    let _ = writeln!(
        html,
        "<button type=\"submit\" class=\"submit-btn\" id=\"submit\" data-idle-label=\"{SUBMIT_LABEL}\" data-busy-label=\"{SUBMITTING_LABEL}\"{disabled}>{label}</button>"
    );

    html.push_str("</form>\n</div>\n");
    let _ = write!(html, "<script>{SCRIPT}</script>\n</body>\n</html>\n");

    html
}

fn text_input(
    html: &mut String,
    form: &IntakeForm,
    field: TicketField,
    label: &str,
    input_type: &str,
    autocomplete: &str,
) {
    let name = field.input_name();
    let _ = writeln!(
        html,
        "<div class=\"form-group\">\n<label for=\"{name}\">{label}:</label>\n\
         <input class=\"input\" type=\"{input_type}\" name=\"{name}\" id=\"{name}\" value=\"{value}\" required autocomplete=\"{autocomplete}\">\n</div>",
        value = escape_html(form.field(field)),
    );
}

fn device_select(html: &mut String, selected: &str) {
    let selected = selected.parse::<Device>().ok();
    html.push_str("<div class=\"form-group\">\n<label for=\"device\">Device:</label>\n");
    html.push_str("<select class=\"input\" name=\"device\" id=\"device\" required>\n");
    html.push_str("<option value=\"\">Please choose...</option>\n");
    for device in Device::ALL {
        let label = device.label();
        let attr = if selected == Some(device) { " selected" } else { "" };
        let _ = writeln!(html, "<option value=\"{label}\"{attr}>{label}</option>");
    }
    html.push_str("</select>\n</div>\n");
}

/// Escape text for HTML element content and quoted attribute values
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::PhotoFile;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_empty_form_has_native_constraints() {
        let html = render_page(&IntakeForm::new(), None);

        assert!(html.contains(r#"type="email" name="email" id="email" value="" required"#));
        assert!(html.contains(r#"type="tel" name="phone""#));
        assert!(html.contains(r#"<select class="input" name="device" id="device" required>"#));
        assert!(html.contains(r#"accept="image/*""#));
        assert!(html.contains(r#"<div class="preview" id="preview" hidden></div>"#));
        assert!(html.contains(">Submit</button>"));
        assert!(!html.contains("role=\"alert\""));
    }

    #[test]
    fn test_device_options_in_order() {
        let html = render_page(&IntakeForm::new(), None);

        let positions: Vec<usize> = Device::ALL
            .iter()
            .map(|d| html.find(&format!("<option value=\"{}\"", d.label())).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_failure_page_keeps_values_without_preview() {
        let mut form = IntakeForm::new();
        form.set_field("name", "Jane \"JD\" Doe").unwrap();
        form.set_field("device", "Tablet").unwrap();
        form.select_photo(Some(PhotoFile::new("a.png", None, vec![1, 2, 3])));

        let html = render_page(&form, Some(&Notification::SaveFailed("timeout".to_string())));

        assert!(html.contains(r#"value="Jane &quot;JD&quot; Doe""#));
        assert!(html.contains(r#"<option value="Tablet" selected>"#));
        assert!(html.contains(r#"<div class="preview" id="preview" hidden></div>"#));
        assert!(!html.contains("data:image/png"));
        assert!(html.contains(
            r#"<div class="notice error" id="notice" role="alert">Error saving ticket: timeout</div>"#
        ));
    }

    #[test]
    fn test_unknown_device_selects_placeholder() {
        let mut form = IntakeForm::new();
        form.set_field("device", "Toaster").unwrap();

        let html = render_page(&form, None);

        assert!(!html.contains(" selected>"));
    }

    #[test]
    fn test_script_posts_with_fetch() {
        let html = render_page(&IntakeForm::new(), None);

        assert!(html.contains("fetch(form.action, { method: \"POST\", body: new FormData(form) })"));
        assert!(html.contains("if (response.ok) { form.reset(); clearPreview(); }"));
        assert!(html.contains(r#"data-idle-label="Submit" data-busy-label="Sending...""#));
    }

    #[test]
    fn test_success_banner() {
        let html = render_page(&IntakeForm::new(), Some(&Notification::Created { ticket_id: 3 }));

        assert!(html.contains(r#"<div class="notice success" id="notice" role="alert">Ticket created successfully!</div>"#));
    }
}
