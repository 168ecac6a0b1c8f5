use comfy_table::{Table, ContentArrangement, presets::UTF8_FULL, Cell, Color};

use crate::analysis::selector::SuggestedBet;
use crate::analysis::{top_by_value, top_pairs, HistoryStatistics};
use crate::import::ImportResult;
use lotofacil_db::models::{is_even, is_low, Draw};

fn format_numbers(numbers: &[u8]) -> String {
    numbers
        .iter()
        .map(|n| format!("{:2}", n))
        .collect::<Vec<_>>()
        .join(" - ")
}

pub fn display_draws(draws: &[Draw]) {
    if draws.is_empty() {
        println!("Aucun tirage à afficher.");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Concours", "Date", "Numéros", "Pairs", "Bas"]);

    for draw in draws {
        table.add_row(vec![
            draw.contest_number.to_string(),
            draw.date.format("%d/%m/%Y").to_string(),
            format_numbers(draw.numbers.as_slice()),
            draw.numbers.even_count().to_string(),
            draw.numbers.low_count().to_string(),
        ]);
    }

    println!("{table}");
}

pub fn display_import_summary(result: &ImportResult, total_in_store: u32) {
    println!("Import terminé :");
    println!("  Total lignes lues : {}", result.total_records);
    println!("  Insérés           : {}", result.inserted);
    println!("  Doublons ignorés  : {}", result.skipped);
    if result.errors > 0 {
        println!("  Erreurs           : {}", result.errors);
    }
    println!("  Total en base     : {}", total_in_store);
}

pub fn display_stats(stats: &HistoryStatistics, draw_count: usize, top: usize) {
    println!("\n📊 Statistiques sur {} tirages\n", draw_count);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Numéro", "Fréquence", "Retard", "Parité", "Moitié"]);

    let mut sorted = stats.number_stats();
    sorted.sort_by(|a, b| b.frequency.cmp(&a.frequency));

    for stat in &sorted {
        table.add_row(vec![
            format!("{:2}", stat.number),
            stat.frequency.to_string(),
            stat.recency.to_string(),
            if is_even(stat.number) { "pair" } else { "impair" }.to_string(),
            if is_low(stat.number) { "bas" } else { "haut" }.to_string(),
        ]);
    }
    println!("{table}");

    println!("\n── Plus fréquents ──");
    println!("  {}", format_numbers(&top_by_value(&stats.frequency, top)));
    println!("\n── Plus en retard ──");
    println!("  {}", format_numbers(&top_by_value(&stats.recency, top)));

    println!("\n── Paires les plus fréquentes ──");
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Paire", "Co-occurrences"]);
    for (pair, count) in top_pairs(&stats.pair_frequency, top) {
        table.add_row(vec![pair.to_string(), count.to_string()]);
    }
    println!("{table}");

    let eo = stats.even_odd_ratio;
    let lh = stats.low_high_ratio;
    println!("\n── Répartition ──");
    println!("  Pairs / impairs : {:.1}% / {:.1}%", eo.even * 100.0, eo.odd * 100.0);
    println!("  Bas / hauts     : {:.1}% / {:.1}%", lh.low * 100.0, lh.high * 100.0);
}

pub fn display_suggestion(bet: &SuggestedBet) {
    let analysis = &bet.analysis;
    println!("\n🎲 Grille suggérée ({} tirages analysés)\n", analysis.total_draws_analyzed);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Numéros", "Répartition"]);

    let balance_cell = if analysis.relaxed {
        Cell::new(&analysis.balanced_selection).fg(Color::Yellow)
    } else {
        Cell::new(&analysis.balanced_selection).fg(Color::Green)
    };
    table.add_row(vec![Cell::new(format_numbers(bet.numbers.as_slice())), balance_cell]);
    println!("{table}");

    let targets = analysis.targets;
    println!(
        "  Cibles : {} pairs / {} impairs, {} bas / {} hauts",
        targets.even, targets.odd, targets.low, targets.high
    );
    if analysis.relaxed {
        println!("  ⚠ Contraintes relâchées pour compléter la grille.");
    }
    println!("  Plus fréquents : {}", format_numbers(&analysis.frequency_based));
    println!("  Plus en retard : {}", format_numbers(&analysis.delayed_numbers));
    println!("  Générée le {} ({})", bet.generated_at.format("%d/%m/%Y %H:%M:%S UTC"), bet.id);
}
