//! Terminal rendering of the export summary and the title analysis.

use crate::cooccurrence::CooccurrenceGraph;
use crate::diversity::Diversity;
use crate::frequency::WordCount;
use crate::pipeline::{AnalysisReport, Section};
use crate::summary::ExportSummary;

const HIGH_DIVERSITY_PERCENT: f64 = 70.0;
const LOW_DIVERSITY_PERCENT: f64 = 40.0;
const DENSE_GRAPH: f64 = 0.15;
const SPARSE_GRAPH: f64 = 0.05;

pub fn diversity_verdict(diversity: &Diversity) -> &'static str {
    if diversity.percent >= HIGH_DIVERSITY_PERCENT {
        "requests are spread evenly across many problem families"
    } else if diversity.percent >= LOW_DIVERSITY_PERCENT {
        "a few problem families dominate but others remain visible"
    } else {
        "requests concentrate on a small number of recurring problems"
    }
}

pub fn density_verdict(graph: &CooccurrenceGraph) -> &'static str {
    if graph.density >= DENSE_GRAPH {
        "vocabulary is tightly interconnected"
    } else if graph.density >= SPARSE_GRAPH {
        "vocabulary forms a few connected themes"
    } else {
        "vocabulary is fragmented into isolated pairs"
    }
}

fn print_skipped<T>(title: &str, section: &Section<T>) -> bool {
    if let Some(reason) = section.skipped_reason() {
        println!("{}", title);
        println!("   ⚠️  Skipped: {}", reason);
        println!();
        return true;
    }
    false
}

fn print_word_counts(words: &[WordCount]) {
    for (i, wc) in words.iter().enumerate() {
        println!("   {:<2}. {:<20} {}", i + 1, wc.word, wc.count);
    }
}

pub fn print_summary(summary: &ExportSummary) {
    let kpis = &summary.kpis;
    println!("📋 Export summary:");
    println!("   Total tickets: {}", kpis.total_tickets);
    match kpis.services {
        Some(n) => println!("   Services: {}", n),
        None => println!("   Services: N/A"),
    }
    match kpis.priority_levels {
        Some(n) => println!("   Priority levels: {}", n),
        None => println!("   Priority levels: N/A"),
    }
    println!("   New tickets: {}", kpis.new_tickets);
    match kpis.last_modified {
        Some(ts) => println!("   Last modification: {}", ts.format("%d-%m-%Y %H:%M")),
        None => println!("   Last modification: N/A"),
    }
    println!();

    if !summary.priority_by_status.is_empty() {
        println!("🚦 Priority by status:");
        for (priority, statuses) in &summary.priority_by_status {
            let cells: Vec<String> = statuses.iter().map(|(s, n)| format!("{}={}", s, n)).collect();
            println!("   {:<12} {}", priority, cells.join(", "));
        }
        println!();
    }

    if !summary.tickets_per_month.is_empty() {
        println!("📅 Tickets per month:");
        for (month, n) in &summary.tickets_per_month {
            println!("   {} {:>5}", month, n);
        }
        println!("🕐 Tickets per hour:");
        for (hour, n) in &summary.tickets_per_hour {
            println!("   {:02}h {:>5}", hour, n);
        }
        println!();
    }

    println!("👤 Top technicians:");
    for (name, n) in &summary.top_technicians {
        println!("   {:<30} {}", name, n);
    }
    println!("🙋 Top requesters:");
    for (name, n) in &summary.top_requesters {
        println!("   {:<30} {}", name, n);
    }
    println!();

    if !summary.categories.is_empty() {
        println!("🗂️  Categories:");
        for category in &summary.categories {
            println!("   {} ({})", category.category, category.tickets);
            for (sub, n) in &category.subcategories {
                println!("      > {:<26} {}", sub, n);
            }
        }
        println!();
    }

    println!(
        "💤 Tickets without modification for more than {} days: {}",
        summary.inactive_days,
        summary.inactive.len()
    );
    for ticket in &summary.inactive {
        println!(
            "   #{:<6} {:<40} {:<20} {}",
            ticket.id.as_deref().unwrap_or("-"),
            ticket.title.as_deref().unwrap_or(""),
            ticket.status.as_deref().unwrap_or(""),
            ticket.last_modified.format("%d-%m-%Y")
        );
    }
    println!();
}

pub fn print_analysis(report: &AnalysisReport, unresolved: &[WordCount]) {
    println!("📊 Vocabulary:");
    println!("   Documents: {}", report.dtm.n_docs());
    println!("   Distinct terms: {}", report.dtm.n_terms());
    println!("   Most frequent words:");
    print_word_counts(&report.frequent_words);
    if !unresolved.is_empty() {
        println!("   Most frequent words in unresolved tickets:");
        print_word_counts(unresolved);
    }
    println!();

    if !print_skipped("🧩 Clusters:", &report.clusters) {
        if let Some(clusters) = report.clusters.ready() {
            println!("🧩 Clusters (k-means, inertia {:.3}):", clusters.model.inertia);
            for (cluster, keywords) in clusters.keywords.iter().enumerate() {
                println!(
                    "   Cluster {} ({} tickets): {}",
                    cluster,
                    clusters.sizes[cluster],
                    keywords.join(", ")
                );
                for title in &clusters.examples[cluster] {
                    println!("      - {}", title);
                }
            }
            println!();
        }
    }

    if !print_skipped("🌈 Diversity:", &report.diversity) {
        if let Some(diversity) = report.diversity.ready() {
            println!("🌈 Diversity:");
            println!(
                "   Entropy: {:.3} / {:.3} ({:.1}%)",
                diversity.entropy, diversity.max_entropy, diversity.percent
            );
            println!("   {}", diversity_verdict(diversity));
            println!();
        }
    }

    if !print_skipped("🎯 Topics:", &report.topics) {
        if let Some(model) = report.topics.ready() {
            println!("🎯 Topics (LDA):");
            for topic in &model.topics {
                println!(
                    "   Topic {} ({} documents, coherence {:.3}): {}",
                    topic.id,
                    topic.documents.len(),
                    topic.coherence_score,
                    topic.keywords().join(", ")
                );
            }
            println!();
        }
    }

    if !print_skipped("🧪 Cluster probe:", &report.probe) {
        if let Some(probe) = report.probe.ready() {
            println!("🧪 Cluster probe (logistic regression):");
            println!(
                "   Accuracy: {:.1}% on {} held-out tickets ({} train)",
                probe.accuracy * 100.0,
                probe.test_size,
                probe.train_size
            );
            println!("   Confusion matrix (rows = true, columns = predicted):");
            for (cluster, row) in probe.confusion.iter().enumerate() {
                let cells: Vec<String> = row.iter().map(|n| format!("{:>4}", n)).collect();
                println!("   {:>3} {}", cluster, cells.join(""));
            }
            println!();
        }
    }

    if !print_skipped("🕸️  Co-occurrence graph:", &report.cooccurrence) {
        if let Some(graph) = report.cooccurrence.ready() {
            println!("🕸️  Co-occurrence graph:");
            println!("   Nodes: {}, edges: {}", graph.node_count(), graph.edge_count());
            println!("   Density: {:.3} ({})", graph.density, density_verdict(graph));
            println!(
                "   Most central word: {} ({:.3})",
                graph.most_central, graph.most_central_score
            );
            let mut strongest: Vec<_> = graph.edges.iter().collect();
            strongest.sort_by(|a, b| b.weight.cmp(&a.weight));
            for edge in strongest.into_iter().take(10) {
                println!("   {:<15} <-> {:<15} {}", edge.source, edge.target, edge.weight);
            }
            println!();
        }
    }

    if !report.diagnostics.is_empty() {
        println!("⚠️  Diagnostics:");
        for diagnostic in &report.diagnostics {
            println!("   {}", diagnostic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(density: f64) -> CooccurrenceGraph {
        CooccurrenceGraph {
            nodes: vec![],
            edges: vec![],
            density,
            degree_centrality: Default::default(),
            most_central: String::new(),
            most_central_score: 0.0,
        }
    }

    #[test]
    fn test_verdict_thresholds() {
        let diversity = |percent| Diversity {
            entropy: 0.0,
            max_entropy: 0.0,
            percent,
        };
        assert!(diversity_verdict(&diversity(70.0)).contains("evenly"));
        assert!(diversity_verdict(&diversity(55.0)).contains("dominate"));
        assert!(diversity_verdict(&diversity(10.0)).contains("concentrate"));

        assert!(density_verdict(&graph(0.2)).contains("tightly"));
        assert!(density_verdict(&graph(0.05)).contains("themes"));
        assert!(density_verdict(&graph(0.01)).contains("fragmented"));
    }
}
