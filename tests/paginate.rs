use qbank_pdf::{
    BlockRenderer, ColumnCount, FontRegistry, HELVETICA, Language, LayoutConfig, OptionLayout, Pt,
    QbankPdf, Question, QuestionSet, inspect_pdf_bytes, wrap_text,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn question(index: usize) -> Question {
    Question {
        id: format!("q{index}"),
        question_eng: format!(
            "Question {index}: which of the following statements about the <b>Constitution</b> \
             of India is correct?"
        ),
        question_hin: "भारत के संविधान के बारे में कौन सा कथन सही है?".to_string(),
        option1_eng: "Only statement 1".to_string(),
        option2_eng: "Only statement 2".to_string(),
        option3_eng: "Both 1 and 2".to_string(),
        option4_eng: "Neither 1 nor 2".to_string(),
        answer: "b".to_string(),
        solution_eng: "Article 1 describes India as a Union of States.".to_string(),
        exam: Some("UPSC".to_string()),
        year: Some("2021".to_string()),
        ..Question::default()
    }
}

fn questions(count: usize) -> Vec<Question> {
    (1..=count).map(question).collect()
}

fn engine(config: LayoutConfig) -> QbankPdf {
    QbankPdf::builder().config(config).build().expect("engine")
}

#[test]
fn single_question_with_answer_key_spans_two_pages() {
    init_logging();
    let mut config = LayoutConfig::default();
    config.show_answer_widget = true;
    let set = QuestionSet::named("Polity Drill");
    let bytes = engine(config)
        .render_to_buffer(&set, &questions(1))
        .expect("render");

    let report = inspect_pdf_bytes(&bytes).expect("inspect");
    assert_eq!(report.page_count, 2);
    assert_eq!(report.title.as_deref(), Some("Polity Drill"));
    assert!(report.page_contains(2, "Answer Key"));
    assert!(report.page_contains(2, "1"));
    assert!(report.page_contains(2, "(B)"));
    assert!(!report.page_contains(1, "Answer Key"));
}

#[test]
fn page_count_never_decreases_as_questions_are_added() {
    let engine = engine(LayoutConfig::default());
    let set = QuestionSet::named("Growth");
    let mut previous = 0;
    for count in 0..=24 {
        let document = engine
            .render_to_document(&set, &questions(count))
            .expect("render");
        assert!(
            document.page_count() >= previous,
            "{count} questions gave {} pages after {previous}",
            document.page_count()
        );
        previous = document.page_count();
    }
    assert!(previous > 1);
}

#[test]
fn single_column_needs_at_least_as_many_pages() {
    let set = QuestionSet::named("Columns");
    let two = engine(LayoutConfig::default())
        .render_to_document(&set, &questions(12))
        .expect("render");
    let mut config = LayoutConfig::default();
    config.columns = ColumnCount::One;
    let one = engine(config)
        .render_to_document(&set, &questions(12))
        .expect("render");
    assert!(one.page_count() >= two.page_count());
}

#[test]
fn blocks_stay_inside_their_columns() {
    let engine = engine(LayoutConfig::default());
    let document = engine
        .render_to_document(&QuestionSet::named("Bounds"), &questions(20))
        .expect("render");
    let page = document.page_size;
    let left = Pt::from_mm(10.0);
    let right = page.width - Pt::from_mm(10.0);
    let top = Pt::from_mm(45.0);
    let bottom = page.height - Pt::from_mm(20.0);
    let mut blocks = 0;
    for page in &document.pages {
        for rect in page.block_bounds() {
            blocks += 1;
            assert!(rect.x >= left && rect.right() <= right, "{rect:?}");
            assert!(rect.y >= top && rect.bottom() <= bottom, "{rect:?}");
        }
    }
    assert!(blocks >= 20);
}

#[test]
fn drawn_text_never_exceeds_the_column_width() {
    let fonts = FontRegistry::new();
    let mut config = LayoutConfig::default();
    config.show_solution = true;
    let width = Pt::from_mm(90.0);
    let renderer = BlockRenderer::new(&fonts, &config, width);
    let mut long = question(1);
    long.option3_eng = "A considerably longer option that describes the federal features \
                        of the Constitution in some detail"
        .to_string();
    long.tags = vec!["federalism".to_string()];
    for q in [question(7), long] {
        let block = renderer.render(&q, 999);
        let (lo, hi) = block.horizontal_extent();
        assert!(lo >= Pt::ZERO);
        assert!(hi <= width, "{hi:?} exceeds {width:?}");
    }
}

#[test]
fn wrapping_is_stable() {
    let fonts = FontRegistry::new();
    let text = "The Preamble was amended only once, by the Forty-second Amendment Act of 1976.";
    let size = Pt::from_f32(10.0);
    let width = Pt::from_f32(120.0);
    let lines = wrap_text(&fonts, HELVETICA, size, text, width);
    assert!(lines.len() > 1);
    for line in &lines {
        assert_eq!(wrap_text(&fonts, HELVETICA, size, line, width), vec![line.clone()]);
        assert!(fonts.measure_text_width(HELVETICA, size, line) <= width);
    }
}

#[test]
fn fifth_option_only_when_enabled_or_answer() {
    let fonts = FontRegistry::new();
    let mut config = LayoutConfig::default();
    config.show_5th_option = false;
    config.language = Language::En;
    let renderer = BlockRenderer::new(&fonts, &config, Pt::from_mm(90.0));
    let labels = |q: &Question| -> Vec<String> {
        renderer
            .render(q, 1)
            .rows()
            .iter()
            .flat_map(|row| row.ops.iter())
            .filter_map(|op| match op {
                qbank_pdf::DrawOp::Text { text, .. } if text.starts_with('(') => {
                    Some(text.clone())
                }
                _ => None,
            })
            .collect()
    };
    assert_eq!(labels(&question(1)), vec!["(a)", "(b)", "(c)", "(d)"]);
    let mut answered_e = question(1);
    answered_e.answer = "e".to_string();
    assert_eq!(labels(&answered_e).len(), 5);
}

#[test]
fn long_option_switches_to_list_layout() {
    let fonts = FontRegistry::new();
    let config = LayoutConfig::default();
    let renderer = BlockRenderer::new(&fonts, &config, Pt::from_mm(90.0));
    let mut config_without_fifth = config.clone();
    config_without_fifth.show_5th_option = false;
    let renderer_four = BlockRenderer::new(&fonts, &config_without_fifth, Pt::from_mm(90.0));

    let short = question(1);
    assert_eq!(renderer_four.render(&short, 1).option_layout(), Some(OptionLayout::Grid));
    // The built-in fifth option is a single short line.
    assert_eq!(renderer.render(&short, 1).option_layout(), Some(OptionLayout::Grid));

    let mut long = question(1);
    long.option2_eng = "x".repeat(35);
    assert_eq!(renderer_four.render(&long, 1).option_layout(), Some(OptionLayout::List));
    assert_eq!(renderer.render(&long, 1).option_layout(), Some(OptionLayout::List));
}

#[test]
fn config_round_trip_renders_identically() {
    let mut config = LayoutConfig::default();
    config.show_solution = true;
    config.show_answer_widget = true;
    config.custom_title = "Weekly Test".to_string();
    let restored = LayoutConfig::from_json_str(&config.to_json().expect("json")).expect("parse");
    assert_eq!(restored, config);

    let set = QuestionSet::named("Round Trip");
    let (bytes_a, stats_a) = engine(config)
        .render_with_stats(&set, &questions(9))
        .expect("render");
    let (bytes_b, stats_b) = engine(restored)
        .render_with_stats(&set, &questions(9))
        .expect("render");
    assert_eq!(stats_a, stats_b);
    assert_eq!(bytes_a, bytes_b);
    assert_eq!(stats_a.page_count, inspect_pdf_bytes(&bytes_a).expect("inspect").page_count);
}

#[test]
fn long_answer_key_continues_on_decorated_pages() {
    let mut config = LayoutConfig::default();
    config.show_answer_widget = true;
    config.hide_option = true;
    config.language = Language::En;
    let document = engine(config)
        .render_to_document(&QuestionSet::named("Bulk"), &questions(200))
        .expect("render");
    let answer_pages: Vec<_> = document
        .pages
        .iter()
        .filter(|page| page.template_name() == Some("answer_key"))
        .collect();
    assert_eq!(answer_pages.len(), 2);
    for page in answer_pages {
        assert!(page.texts().any(|text| text == "PRACTICE SET"));
    }
}

#[test]
fn files_and_debug_traces_are_written() {
    let dir = tempfile::tempdir().expect("tempdir");
    let trace = dir.path().join("layout.jsonl");
    let out = dir.path().join("set.pdf");
    let engine = QbankPdf::builder()
        .debug_log(&trace)
        .compress_streams(false)
        .build()
        .expect("engine");
    let written = engine
        .render_to_file(&QuestionSet::named("Trace"), &questions(15), &out)
        .expect("render");
    assert_eq!(std::fs::metadata(&out).expect("pdf").len() as usize, written);

    let records: Vec<serde_json::Value> = std::fs::read_to_string(&trace)
        .expect("trace")
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    assert!(records.iter().any(|r| r["type"] == "qbank.page_break"));
    let summary = records.last().expect("summary");
    assert_eq!(summary["type"], "debug.summary");
    assert_eq!(summary["context"], "render_to_buffer");
}

#[cfg(feature = "async")]
#[tokio::test]
async fn async_render_matches_sync_render() {
    let engine = engine(LayoutConfig::default());
    let set = QuestionSet::named("Async");
    let sync = engine.render_to_buffer(&set, &questions(3)).expect("sync");
    let asynchronous = engine
        .render_async(set.clone(), questions(3))
        .await
        .expect("async");
    assert_eq!(sync, asynchronous);
}
