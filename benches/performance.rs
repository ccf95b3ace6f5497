use pure_rte::{
    Editor,
    editor::{Boundary, ClipboardPayload, StyleCategory, StyleContext, clean},
    markup,
    render::render_tree,
    theme::Theme,
};
use std::time::{Duration, Instant};

/// Performance benchmark suite for the editing core
///
/// Run with: cargo test --release --bench performance -- --nocapture
///
/// This measures:
/// - Markup parsing and serialization
/// - Terminal rendering
/// - Paste sanitizing
/// - Selection scoped formatting
/// - Mode switching and typing
const SMALL_DOC_PARAGRAPHS: usize = 10;
const MEDIUM_DOC_PARAGRAPHS: usize = 100;
const LARGE_DOC_PARAGRAPHS: usize = 1000;

const ITERATIONS: usize = 100;

const SAMPLE_WORDS: &[&str] = &[
    "Lorem",
    "ipsum",
    "dolor",
    "sit",
    "amet",
    "consectetur",
    "adipiscing",
    "elit",
    "sed",
    "do",
    "eiusmod",
    "tempor",
    "incididunt",
    "ut",
    "labore",
    "et",
    "dolore",
    "magna",
    "aliqua",
];

/// Markup with the specified number of blocks, mixing paragraphs, quotes,
/// lists and inline formatting.
fn create_test_markup(num_paragraphs: usize, avg_words_per_para: usize) -> String {
    let mut out = String::new();
    for i in 0..num_paragraphs {
        let mut words = Vec::with_capacity(avg_words_per_para);
        for j in 0..avg_words_per_para {
            let word = SAMPLE_WORDS[(i * 7 + j) % SAMPLE_WORDS.len()];
            let word = match j % 9 {
                3 => format!("<b>{word}</b>"),
                5 => format!("<i>{word}</i>"),
                7 => format!("<a href=\"https://example.com/{i}\">{word}</a>"),
                _ => word.to_string(),
            };
            words.push(word);
        }
        let body = words.join(" ");
        match i % 6 {
            0 => out.push_str(&format!("<h2>{body}</h2>")),
            1 => out.push_str(&format!("<blockquote><p>{body}</p></blockquote>")),
            2 => out.push_str(&format!("<ul><li>{body}</li><li>{body}</li></ul>")),
            _ => out.push_str(&format!("<p>{body}</p>")),
        }
    }
    out
}

/// Clipboard markup the way word processors put it on the clipboard.
fn create_clipboard_page(num_paragraphs: usize) -> String {
    let mut out = String::from(
        "<html><head><meta charset=\"utf-8\"><style>p { margin: 0 }</style></head><body><!--StartFragment-->",
    );
    for i in 0..num_paragraphs {
        out.push_str(&format!(
            "<p class=\"MsoNormal\" style=\"margin:0\"><span style=\"font-weight:700\">{}</span> <span style=\"font-style:italic;text-decoration:underline\">{}</span> <font face=\"Arial\">{}</font><script>track({i})</script></p>",
            SAMPLE_WORDS[i % SAMPLE_WORDS.len()],
            SAMPLE_WORDS[(i + 3) % SAMPLE_WORDS.len()],
            SAMPLE_WORDS[(i + 5) % SAMPLE_WORDS.len()],
        ));
    }
    out.push_str("<!--EndFragment--></body></html>");
    out
}

struct BenchmarkResult {
    name: String,
    iterations: usize,
    total_duration: Duration,
    avg_duration: Duration,
    min_duration: Duration,
    max_duration: Duration,
}

impl BenchmarkResult {
    fn print(&self) {
        println!("\n{}", "=".repeat(70));
        println!("Benchmark: {}", self.name);
        println!("{}", "=".repeat(70));
        println!("Iterations:     {}", self.iterations);
        println!("Total time:     {:?}", self.total_duration);
        println!("Average:        {:?}", self.avg_duration);
        println!("Min:            {:?}", self.min_duration);
        println!("Max:            {:?}", self.max_duration);
        println!(
            "Ops/sec:        {:.2}",
            1_000_000.0 / self.avg_duration.as_micros().max(1) as f64
        );

        if self.avg_duration.as_millis() > 100 {
            println!("\n⚠️  WARNING: Average duration > 100ms (user-perceptible lag)");
        } else if self.avg_duration.as_millis() > 16 {
            println!("\n⚠️  WARNING: Average duration > 16ms (may drop frames)");
        }
    }
}

fn benchmark<F>(name: &str, iterations: usize, mut f: F) -> BenchmarkResult
where
    F: FnMut(),
{
    let mut durations = Vec::with_capacity(iterations);

    // Warmup
    for _ in 0..10 {
        f();
    }

    for _ in 0..iterations {
        let start = Instant::now();
        f();
        durations.push(start.elapsed());
    }

    let total_duration: Duration = durations.iter().sum();
    let avg_duration = total_duration / iterations as u32;
    let min_duration = *durations.iter().min().unwrap();
    let max_duration = *durations.iter().max().unwrap();

    BenchmarkResult {
        name: name.to_string(),
        iterations,
        total_duration,
        avg_duration,
        min_duration,
        max_duration,
    }
}

fn documents() -> Vec<(&'static str, String)> {
    vec![
        (
            "Small (10 blocks)",
            create_test_markup(SMALL_DOC_PARAGRAPHS, 20),
        ),
        (
            "Medium (100 blocks)",
            create_test_markup(MEDIUM_DOC_PARAGRAPHS, 20),
        ),
        (
            "Large (1000 blocks)",
            create_test_markup(LARGE_DOC_PARAGRAPHS, 20),
        ),
    ]
}

fn iterations_for(name: &str) -> usize {
    if name.contains("Large") { 10 } else { ITERATIONS }
}

#[test]
fn bench_parse_and_serialize() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║           PARSE / SERIALIZE BENCHMARKS                         ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    for (name, markup) in documents() {
        let result = benchmark(&format!("parse_fragment - {name}"), iterations_for(name), || {
            let _ = markup::parse_fragment(&markup);
        });
        result.print();

        let fragment = markup::parse_fragment(&markup);
        let result = benchmark(
            &format!("serialize_children - {name}"),
            iterations_for(name),
            || {
                let _ = markup::serialize_children(fragment.tree(), fragment.root());
            },
        );
        result.print();
    }
}

#[test]
fn bench_rendering_performance() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║           RENDERING PERFORMANCE BENCHMARKS                     ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    let theme = Theme::default();
    for (name, markup) in documents() {
        let mut editor = Editor::from_markup(&markup);
        editor.move_to_document_end(false);
        let caret = editor.caret_position();
        let result = benchmark(&format!("render_tree - {name}"), iterations_for(name), || {
            let _ = render_tree(editor.tree(), 80, caret, None, &theme);
        });
        result.print();
    }
}

#[test]
fn bench_paste_sanitizing() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║              PASTE SANITIZING BENCHMARKS                       ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    let context = StyleContext::from_categories(&[StyleCategory::Bold, StyleCategory::Quote]);
    for paragraphs in [10, 100, 1000] {
        let payload = ClipboardPayload::html(create_clipboard_page(paragraphs));
        let result = benchmark(
            &format!("clean - {paragraphs} pasted paragraphs"),
            if paragraphs >= 1000 { 10 } else { ITERATIONS },
            || {
                let _ = clean(&payload, context);
            },
        );
        result.print();
    }

    let text: String = (0..1000)
        .map(|i| SAMPLE_WORDS[i % SAMPLE_WORDS.len()])
        .collect::<Vec<_>>()
        .join("\r\n");
    let payload = ClipboardPayload::plain_text(text);
    let result = benchmark("clean - 1000 plain text lines", ITERATIONS, || {
        let _ = clean(&payload, context);
    });
    result.print();
}

#[test]
fn bench_wrap_and_clear_cycle() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║              WRAP / CLEAR STYLE BENCHMARKS                     ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    for (name, markup) in documents() {
        let mut editor = Editor::from_markup(&markup);
        let middle = editor.tree().children(editor.root()).len() / 2;
        let block = editor.tree().children(editor.root())[middle];
        editor.select_node_contents(block);

        let result = benchmark(
            &format!("wrap_inside_tag + clear_selection_style - {name}"),
            iterations_for(name),
            || {
                editor.wrap_inside_tag("b");
                editor.clear_selection_style();
            },
        );
        result.print();
    }
}

#[test]
fn bench_mode_toggle() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║                MODE TOGGLE BENCHMARKS                          ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    for (name, markup) in documents() {
        let mut editor = Editor::from_markup(&markup);
        let result = benchmark(
            &format!("toggle_mode round trip - {name}"),
            iterations_for(name),
            || {
                editor.toggle_mode();
                editor.toggle_mode();
            },
        );
        result.print();
        editor.take_notifications();
    }
}

#[test]
fn bench_editing_insert_text() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║                TYPING BENCHMARKS                               ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    for (name, markup) in documents() {
        let mut editor = Editor::from_markup(&markup);
        let first_text = editor
            .tree()
            .descendants(editor.root())
            .into_iter()
            .find(|node| editor.tree().is_text(*node));
        if let Some(node) = first_text {
            editor.collapse_to(Boundary::new(node, 0));
        }

        let result = benchmark(
            &format!("insert_text + delete_backward - {name}"),
            iterations_for(name),
            || {
                editor.insert_text("x");
                editor.delete_backward();
            },
        );
        result.print();
    }
}

#[cfg(test)]
mod summary {
    #[test]
    fn print_summary() {
        println!("\n\n╔════════════════════════════════════════════════════════════════╗");
        println!("║                    BENCHMARK SUMMARY                           ║");
        println!("╚════════════════════════════════════════════════════════════════╝");
        println!("\nTo run all benchmarks:");
        println!("  cargo test --release --bench performance -- --nocapture --test-threads=1");
        println!("\nTo run a specific benchmark:");
        println!(
            "  cargo test --release --bench performance bench_paste_sanitizing -- --nocapture"
        );
        println!("\nPerformance targets:");
        println!("  • < 10ms per keypress = smooth typing");
        println!("  • < 16ms per operation = smooth 60 FPS");
        println!("  • > 100ms = noticeable lag");
    }
}
