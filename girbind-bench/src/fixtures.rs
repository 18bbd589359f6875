//! Synthetic GIR documents.

use std::fmt::Write;

/// Builds a namespace with `classes` classes in one inheritance chain,
/// each with a few methods, a signal and an async pair, plus a record and
/// an enumeration per class.
#[must_use]
pub fn synthetic_namespace(name: &str, classes: usize) -> String {
    let prefix = name.to_lowercase();
    let mut xml = String::from("<?xml version=\"1.0\"?>\n<repository version=\"1.2\">\n");
    let _ = writeln!(
        xml,
        "  <namespace name=\"{name}\" version=\"1.0\" shared-library=\"lib{prefix}.so.1\">"
    );
    xml.push_str(
        "    <callback name=\"AsyncReadyCallback\">\n      <return-value><type name=\"none\"/></return-value>\n    </callback>\n",
    );

    for i in 0..classes {
        let parent = if i == 0 {
            String::new()
        } else {
            format!(" parent=\"Node{}\"", i - 1)
        };
        let _ = writeln!(
            xml,
            "    <class name=\"Node{i}\"{parent} glib:type-name=\"{name}Node{i}\" glib:get-type=\"{prefix}_node{i}_get_type\">"
        );
        let _ = writeln!(
            xml,
            "      <constructor name=\"new\" c:identifier=\"{prefix}_node{i}_new\">\n        <return-value><type name=\"Node{i}\"/></return-value>\n      </constructor>"
        );
        let _ = writeln!(
            xml,
            "      <method name=\"get_next\" c:identifier=\"{prefix}_node{i}_get_next\">\n        <return-value nullable=\"1\"><type name=\"Node{i}\"/></return-value>\n      </method>"
        );
        let _ = writeln!(
            xml,
            "      <method name=\"set_value\" c:identifier=\"{prefix}_node{i}_set_value\" throws=\"1\">\n        <return-value><type name=\"none\"/></return-value>\n        <parameters>\n          <parameter name=\"value\"><type name=\"gint\"/></parameter>\n          <parameter name=\"label\" nullable=\"1\"><type name=\"utf8\"/></parameter>\n        </parameters>\n      </method>"
        );
        let _ = writeln!(
            xml,
            "      <method name=\"load_async\" c:identifier=\"{prefix}_node{i}_load_async\">\n        <return-value><type name=\"none\"/></return-value>\n        <parameters>\n          <parameter name=\"callback\" scope=\"async\"><type name=\"AsyncReadyCallback\"/></parameter>\n        </parameters>\n      </method>"
        );
        let _ = writeln!(
            xml,
            "      <method name=\"load_finish\" c:identifier=\"{prefix}_node{i}_load_finish\" throws=\"1\">\n        <return-value><type name=\"gboolean\"/></return-value>\n        <parameters>\n          <parameter name=\"result\"><type name=\"gpointer\"/></parameter>\n        </parameters>\n      </method>"
        );
        let _ = writeln!(
            xml,
            "      <glib:signal name=\"changed-{i}\">\n        <return-value><type name=\"none\"/></return-value>\n        <parameters>\n          <parameter name=\"node\"><type name=\"Node{i}\"/></parameter>\n        </parameters>\n      </glib:signal>"
        );
        xml.push_str("    </class>\n");

        let _ = writeln!(
            xml,
            "    <record name=\"Point{i}\" c:type=\"{name}Point{i}\">\n      <field name=\"x\" writable=\"1\"><type name=\"gint\"/></field>\n      <field name=\"y\" writable=\"1\"><type name=\"gdouble\"/></field>\n    </record>"
        );
        let _ = writeln!(
            xml,
            "    <enumeration name=\"Kind{i}\">\n      <member name=\"first\" value=\"0\"/>\n      <member name=\"second\" value=\"1\"/>\n    </enumeration>"
        );
    }

    xml.push_str("  </namespace>\n</repository>\n");
    xml
}
