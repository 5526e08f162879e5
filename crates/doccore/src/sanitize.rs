use ammonia::Builder;

/// Cleans untrusted markup: script and style content is dropped, unsafe URL
/// schemes are removed, and only the attributes the codec reads back survive.
pub fn sanitize_markup(html: &str) -> String {
    create_secure_sanitizer().clean(html).to_string()
}

fn create_secure_sanitizer() -> Builder<'static> {
    // ammonia's defaults already strip scripts and javascript: URLs
    let mut builder = Builder::default();
    builder
        .link_rel(None)
        .add_tag_attributes("a", &["target"])
        .add_tag_attributes("ol", &["start"])
        .add_tag_attributes("p", &["style"]);
    for heading in ["h1", "h2", "h3", "h4", "h5", "h6"] {
        builder.add_tag_attributes(heading, &["style"]);
    }
    builder
}
