use std::fmt::Write;

use resp::Reply;

/// Render a reply the way redis-cli prints it.
pub fn render(reply: &Reply) -> String {
	let mut out = String::new();
	render_into(&mut out, reply, 0);
	out
}

fn render_into(out: &mut String, reply: &Reply, indent: usize) {
	match reply {
		Reply::Status(s) => out.push_str(&String::from_utf8_lossy(s)),
		Reply::Error(e) => {
			let _ = write!(out, "(error) {}", String::from_utf8_lossy(e));
		}
		Reply::Integer(i) => {
			let _ = write!(out, "(integer) {}", i);
		}
		Reply::Bulk(Some(b)) => {
			let _ = write!(out, "{:?}", String::from_utf8_lossy(b));
		}
		Reply::Bulk(None) | Reply::Array(None) => out.push_str("(nil)"),
		Reply::Array(Some(items)) if items.is_empty() => out.push_str("(empty array)"),
		Reply::Array(Some(items)) => {
			let width = items.len().to_string().len();
			for (i, item) in items.iter().enumerate() {
				if i > 0 {
					out.push('\n');
					out.push_str(&" ".repeat(indent));
				}
				let label = format!("{:>width$}) ", i + 1, width = width);
				out.push_str(&label);
				render_into(out, item, indent + label.len());
			}
		}
	}
}
