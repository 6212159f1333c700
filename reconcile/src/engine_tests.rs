//! End-to-end tests for the reconciliation workflows

use super::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const PRIMARY: &str = "820260968";
const SECONDARY: &str = "2129060088";
const EXTRA: &str = "1862018480";

/// A game directory holding mod trees side by side
struct GameDir {
    dir: TempDir,
    config: ReconcileConfig,
}

impl GameDir {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = ReconcileConfig {
            game_root: dir.path().to_path_buf(),
            ..Default::default()
        };
        Self { dir, config }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn add(&self, mod_id: &str, relative: &str, content: &str) {
        let path = self.root().join(mod_id).join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn mkdir(&self, mod_id: &str) {
        fs::create_dir_all(self.root().join(mod_id)).unwrap();
    }

    fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.root().join(relative)).unwrap()
    }

    fn output_files(&self) -> Vec<PathBuf> {
        let root = self.root().join(format!("diff{}", SECONDARY));
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.path().strip_prefix(&root).unwrap().to_path_buf())
            .collect();
        files.sort();
        files
    }

    fn mods(&self, extra: &[&str]) -> ModSelection {
        let extra: Vec<String> = extra.iter().map(|id| id.to_string()).collect();
        ModSelection::resolve(&self.config.mods, PRIMARY, SECONDARY, &extra)
    }
}

mod mod_selection_tests {
    use super::*;

    #[test]
    fn test_tags_resolved_and_secondary_crawled_first() {
        let catalog = ModCatalog::default();
        let mods = ModSelection::resolve(
            &catalog,
            "road_to_56",
            "road_to_anime",
            &["anime_history".to_string(), "42".to_string()],
        );

        assert_eq!(mods.primary, PRIMARY);
        assert_eq!(mods.secondary, SECONDARY);
        assert_eq!(mods.crawl, vec![SECONDARY, EXTRA, "42"]);
        assert_eq!(mods.crawl_target(), SECONDARY);
    }

    #[test]
    fn test_default_passes() {
        let game = GameDir::new();
        let passes = CrawlPass::default_passes(&game.config, &game.mods(&[EXTRA]));

        let summary: Vec<(&str, bool, &str)> = passes
            .iter()
            .map(|p| (p.target.as_str(), p.policy.is_exact(), p.suffix.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![(SECONDARY, true, ""), (SECONDARY, false, "_v0"), (EXTRA, false, "_v1")]
        );
    }
}

mod crawl_tests {
    use super::*;

    #[tokio::test]
    async fn test_tail_match_fills_missing_portrait() {
        let game = GameDir::new();
        game.add(PRIMARY, "gfx/leaders/MEX/Portrait_MEX_Lazaro_Cardenas.dds", "primary");
        game.add(SECONDARY, "gfx/leaders/MEX/Portrait_Mexico_Lazaro_Cardenas.dds", "anime");

        let metrics = crawl_mods(&game.config, &game.mods(&[])).await.unwrap();

        assert_eq!(metrics.assets.required, 1);
        assert_eq!(metrics.assets.resolved, 1);
        assert_eq!(metrics.assets.unresolved, 0);
        assert_eq!(
            game.output_files(),
            vec![PathBuf::from("gfx/leaders/MEX/Portrait_MEX_Lazaro_Cardenas.dds")]
        );
        assert_eq!(
            game.read(&format!("diff{}/gfx/leaders/MEX/Portrait_MEX_Lazaro_Cardenas.dds", SECONDARY)),
            "anime"
        );
        assert_eq!(
            game.read("missing_items.txt"),
            "gfx/leaders/MEX/Portrait_MEX_Lazaro_Cardenas.dds\n"
        );
        assert!(!game.read("unresolved_items.txt").contains("Lazaro"));
    }

    #[tokio::test]
    async fn test_present_assets_are_skipped() {
        let game = GameDir::new();
        game.add(PRIMARY, "gfx/interface/techtree/techtree_tank_tab.dds", "primary");
        game.add(SECONDARY, "gfx/interface/techtree/techtree_tank_tab.dds", "anime");
        game.add(PRIMARY, "gfx/interface/readme.txt", "not an asset");

        let metrics = crawl_mods(&game.config, &game.mods(&[])).await.unwrap();

        assert_eq!(metrics.assets.required, 1);
        assert_eq!(metrics.assets.present, 1);
        assert!(game.output_files().is_empty());
        assert_eq!(game.read("missing_items.txt"), "");
    }

    #[tokio::test]
    async fn test_exact_pass_keeps_found_directory() {
        let game = GameDir::new();
        game.add(PRIMARY, "gfx/leaders/MEX/Portrait_MEX_Lazaro_Cardenas.dds", "primary");
        game.add(SECONDARY, "gfx/leaders/Mexico/portrait_mex_lazaro_cardenas.dds", "anime");

        crawl_mods(&game.config, &game.mods(&[])).await.unwrap();

        // Mirrors the secondary layout, keeps the required file name
        assert_eq!(
            game.output_files(),
            vec![PathBuf::from("gfx/leaders/Mexico/Portrait_MEX_Lazaro_Cardenas.dds")]
        );
    }

    #[tokio::test]
    async fn test_collisions_get_pass_suffix() {
        let game = GameDir::new();
        game.add(PRIMARY, "gfx/leaders/MEX/Portrait_MEX_Lazaro_Cardenas.dds", "primary");
        game.add(PRIMARY, "gfx/leaders/Mexico/Portrait_MEX_Lazaro_Cardenas.dds", "primary");
        game.add(SECONDARY, "gfx/leaders/MEX/Portrait_Mexico_Lazaro_Cardenas.dds", "anime");

        let metrics = crawl_mods(&game.config, &game.mods(&[])).await.unwrap();

        assert_eq!(metrics.assets.resolved, 2);
        assert_eq!(metrics.assets.renamed, 1);
        assert_eq!(
            game.output_files(),
            vec![
                PathBuf::from("gfx/leaders/MEX/Portrait_MEX_Lazaro_Cardenas.dds"),
                PathBuf::from("gfx/leaders/MEX/Portrait_MEX_Lazaro_Cardenas_v0.dds"),
            ]
        );
    }

    #[tokio::test]
    async fn test_falls_back_to_extra_crawl_mod() {
        let game = GameDir::new();
        game.add(PRIMARY, "gfx/leaders/GER/Portrait_GER_Otto_von_Bismarck.dds", "primary");
        game.add(PRIMARY, "gfx/leaders/GER/Portrait_GER_Nobody.dds", "primary");
        game.mkdir(SECONDARY);
        game.add(EXTRA, "gfx/leaders/Germany/Portrait_Otto_von_Bismarck.dds", "extra");

        let metrics = crawl_mods(&game.config, &game.mods(&[EXTRA])).await.unwrap();

        assert_eq!(metrics.assets.resolved, 1);
        assert_eq!(metrics.assets.unresolved, 1);
        assert_eq!(
            game.output_files(),
            vec![PathBuf::from("gfx/leaders/Germany/Portrait_GER_Otto_von_Bismarck.dds")]
        );
        assert_eq!(
            game.read("unresolved_items.txt"),
            "\nleaders:\ngfx/leaders/GER/Portrait_GER_Nobody.dds\n\nministers:\n\nadvisors:\n\nmisc:\n"
        );
    }

    #[tokio::test]
    async fn test_role_guard_keeps_ministers_out_of_leaders() {
        let game = GameDir::new();
        game.add(PRIMARY, "gfx/leaders/MEX/Portrait_MEX_Francisco_Mugica.dds", "primary");
        game.add(SECONDARY, "gfx/interface/ministers/MEX/Portrait_Mexico_Francisco_Mugica.dds", "anime");

        let metrics = crawl_mods(&game.config, &game.mods(&[])).await.unwrap();

        assert_eq!(metrics.assets.unresolved, 1);
        assert!(game.output_files().is_empty());
    }

    #[tokio::test]
    async fn test_indexed_matches_walking() {
        let mut layouts = Vec::new();

        for indexed in [false, true] {
            let mut game = GameDir::new();
            game.config.indexed = indexed;
            game.add(PRIMARY, "gfx/leaders/MEX/Portrait_MEX_Lazaro_Cardenas.dds", "p");
            game.add(PRIMARY, "gfx/leaders/MEX/Portrait_MEX_Manuel_Avila_Camacho.dds", "p");
            game.add(PRIMARY, "gfx/leaders/Mexico/Portrait_MEX_Lazaro_Cardenas.dds", "p");
            game.add(SECONDARY, "gfx/leaders/MEX/Portrait_Mexico_Lazaro_Cardenas.dds", "a");
            game.add(SECONDARY, "gfx/leaders/MEX/b/Portrait_Lazaro_Cardenas.dds", "a");
            game.add(SECONDARY, "gfx/leaders/Avila_Camacho.dds", "a");

            let metrics = crawl_mods(&game.config, &game.mods(&[])).await.unwrap();
            layouts.push((game.output_files(), metrics.assets.resolved));
        }

        assert_eq!(layouts[0], layouts[1]);
        assert_eq!(layouts[0].1, 3);
    }

    #[tokio::test]
    async fn test_copy_failure_aborts_by_default() {
        let game = GameDir::new();
        game.add(PRIMARY, "gfx/leaders/MEX/Portrait_MEX_Lazaro_Cardenas.dds", "primary");
        game.add(SECONDARY, "gfx/leaders/MEX/Portrait_Mexico_Lazaro_Cardenas.dds", "anime");
        // A file where the output tree should go makes every copy fail
        fs::write(game.root().join(format!("diff{}", SECONDARY)), b"").unwrap();

        let err = crawl_mods(&game.config, &game.mods(&[])).await.unwrap_err();
        assert!(matches!(err, ReconcileError::FileCopy { .. }));
        assert!(err.is_io());
    }

    #[tokio::test]
    async fn test_copy_failure_recorded_when_continuing() {
        let mut game = GameDir::new();
        game.config.continue_on_error = true;
        game.add(PRIMARY, "gfx/leaders/MEX/Portrait_MEX_Lazaro_Cardenas.dds", "primary");
        game.add(SECONDARY, "gfx/leaders/MEX/Portrait_Mexico_Lazaro_Cardenas.dds", "anime");
        fs::write(game.root().join(format!("diff{}", SECONDARY)), b"").unwrap();

        let metrics = crawl_mods(&game.config, &game.mods(&[])).await.unwrap();

        assert_eq!(metrics.assets.unresolved, 1);
        assert_eq!(metrics.errors.recoverable_errors.len(), 1);
        assert!(metrics.errors.critical_errors.is_empty());
        assert!(game
            .read("unresolved_items.txt")
            .contains("gfx/leaders/MEX/Portrait_MEX_Lazaro_Cardenas.dds"));
    }

    #[tokio::test]
    async fn test_empty_output_prefix_rejected() {
        let mut game = GameDir::new();
        game.config.output_prefix.clear();
        game.add(PRIMARY, "gfx/leaders/MEX/Portrait_MEX_Lazaro_Cardenas.dds", "primary");
        game.add(SECONDARY, "gfx/leaders/Mexico/Portrait_Mexico_Lazaro_Cardenas.dds", "anime");

        let err = crawl_mods(&game.config, &game.mods(&[])).await.unwrap_err();
        assert!(matches!(err, ReconcileError::Config(_)));
        assert!(!game
            .root()
            .join(SECONDARY)
            .join("gfx/leaders/Mexico/Portrait_MEX_Lazaro_Cardenas.dds")
            .exists());
    }

    #[tokio::test]
    async fn test_scan_options_reach_the_walk() {
        let mut game = GameDir::new();
        game.add(PRIMARY, "gfx/leaders/.old/Portrait_MEX_Lazaro_Cardenas.dds", "primary");
        game.mkdir(SECONDARY);

        let metrics = crawl_mods(&game.config, &game.mods(&[])).await.unwrap();
        assert_eq!(metrics.assets.required, 0);

        game.config.scan.include_hidden = true;
        let metrics = crawl_mods(&game.config, &game.mods(&[])).await.unwrap();
        assert_eq!(metrics.assets.required, 1);
        assert_eq!(metrics.assets.unresolved, 1);
    }

    #[test]
    fn test_engine_pins_relative_root() {
        let config = ReconcileConfig::default();
        let engine = ReconcileEngine::new(&config).unwrap();

        assert!(engine.config().game_root.is_absolute());
        assert_eq!(engine.config().game_root, std::env::current_dir().unwrap());
    }

    #[tokio::test]
    async fn test_missing_primary_is_an_error() {
        let game = GameDir::new();
        game.mkdir(SECONDARY);

        let err = crawl_mods(&game.config, &game.mods(&[])).await.unwrap_err();
        assert!(matches!(err, ReconcileError::Path { .. }));
    }
}

mod portrait_tests {
    use super::*;

    const LAT_DEFINITIONS: &str = r#"
characters = {
    LAT_karlis_ulmanis = {
        portraits = {
            civilian = {
                large = "GFX_portrait_karlis_ulmanis"
                small = "GFX_idea_karlis_ulmanis"
            }
        }
    }
    LAT_janis_balodis = {
        portraits = {
            army = {
                large = "GFX_portrait_janis_balodis"
            }
        }
    }
}
"#;

    fn latvia() -> GameDir {
        let game = GameDir::new();
        game.add(PRIMARY, "common/characters/LAT.txt", LAT_DEFINITIONS);
        game.add(SECONDARY, "gfx/leaders/LAT/portrait_janis_balodis.dds", "present");
        game.add(SECONDARY, "gfx/leaders/Latvia/LAT_portrait_karlis_ulmanis.dds", "anime");
        game
    }

    #[tokio::test]
    async fn test_portraits_copied_under_required_directory() {
        let game = latvia();

        let metrics = reconcile_portraits(&game.config, &game.mods(&[])).await.unwrap();

        assert_eq!(metrics.assets.required, 3);
        assert_eq!(metrics.assets.present, 1);
        assert_eq!(metrics.assets.resolved, 1);
        assert_eq!(metrics.assets.unresolved, 1);
        assert_eq!(
            game.output_files(),
            vec![PathBuf::from("gfx/leaders/LAT/portrait_karlis_ulmanis.dds")]
        );
        assert_eq!(
            game.read(&format!("diff{}/gfx/leaders/LAT/portrait_karlis_ulmanis.dds", SECONDARY)),
            "anime"
        );
    }

    #[tokio::test]
    async fn test_parsed_and_unresolved_reports() {
        let game = latvia();

        reconcile_portraits(&game.config, &game.mods(&[])).await.unwrap();

        assert_eq!(
            game.read("parsed_items.txt"),
            "\nleaders:\ngfx/leaders/LAT/portrait_karlis_ulmanis.dds\n\
             \nministers:\n\nadvisors:\n\
             \nmisc:\ngfx/interface/ideas/karlis_ulmanis.dds\n"
        );
        assert_eq!(
            game.read("unresolved_items.txt"),
            "\nleaders:\n\nministers:\n\nadvisors:\n\
             \nmisc:\ngfx/interface/ideas/karlis_ulmanis.dds\n"
        );
    }

    #[tokio::test]
    async fn test_duplicate_references_counted_once() {
        let game = GameDir::new();
        game.add(PRIMARY, "common/characters/LAT.txt", "large = \"GFX_portrait_x\"\nsmall = \"GFX_portrait_x\"\n");
        game.add(
            PRIMARY,
            "common/characters/LAT_extra.txt",
            "large = \"gfx/leaders/LAT/portrait_x.dds\"\nsmall = \"GFX_portrait_x\"\n",
        );
        game.mkdir(SECONDARY);

        let metrics = reconcile_portraits(&game.config, &game.mods(&[])).await.unwrap();

        assert_eq!(metrics.assets.required, 2);
        assert_eq!(metrics.assets.unresolved, 2);
        let parsed = game.read("parsed_items.txt");
        assert_eq!(parsed.matches("gfx/leaders/LAT/portrait_x.dds").count(), 1);
        assert!(parsed.contains("gfx/leaders/LAT_extra/portrait_x.dds"));
    }

    #[tokio::test]
    async fn test_existing_copy_gets_portrait_suffix() {
        let game = latvia();
        game.add(
            &format!("diff{}", SECONDARY),
            "gfx/leaders/LAT/portrait_karlis_ulmanis.dds",
            "earlier run",
        );

        let metrics = reconcile_portraits(&game.config, &game.mods(&[])).await.unwrap();

        assert_eq!(metrics.assets.renamed, 1);
        assert_eq!(
            game.read(&format!("diff{}/gfx/leaders/LAT/portrait_karlis_ulmanis.dds", SECONDARY)),
            "earlier run"
        );
        assert_eq!(
            game.read(&format!("diff{}/gfx/leaders/LAT/portrait_karlis_ulmanis_alt.dds", SECONDARY)),
            "anime"
        );
    }

    #[tokio::test]
    async fn test_references_leaving_the_mod_are_unresolved() {
        let game = GameDir::new();
        game.add(
            PRIMARY,
            "common/characters/LAT.txt",
            "large = \"../../escaped_portrait.dds\"\nsmall = \"gfx/../../../escaped_idea.dds\"\n",
        );
        game.add(SECONDARY, "gfx/portraits/LAT_escaped_portrait.dds", "anime");
        game.add(SECONDARY, "gfx/portraits/LAT_escaped_idea.dds", "anime");

        let metrics = reconcile_portraits(&game.config, &game.mods(&[])).await.unwrap();

        assert_eq!(metrics.assets.required, 2);
        assert_eq!(metrics.assets.resolved, 0);
        assert_eq!(metrics.assets.unresolved, 2);
        assert!(!game.root().join("escaped_portrait.dds").exists());
        assert!(!game.root().parent().unwrap().join("escaped_portrait.dds").exists());
        assert!(game.output_files().is_empty());
        assert_eq!(
            game.read("unresolved_items.txt"),
            "\nleaders:\n\nministers:\n\nadvisors:\n\
             \nmisc:\n../../escaped_portrait.dds\ngfx/../../../escaped_idea.dds\n"
        );
    }

    #[tokio::test]
    async fn test_reference_without_extension_is_unresolved() {
        let game = GameDir::new();
        game.add(PRIMARY, "common/characters/LAT.txt", "large = \"foo.png\"\n");
        game.add(SECONDARY, "foo.dds", "anime");

        let metrics = reconcile_portraits(&game.config, &game.mods(&[])).await.unwrap();

        assert_eq!(metrics.assets.required, 1);
        assert_eq!(metrics.assets.unresolved, 1);
        assert!(game.output_files().is_empty());
        assert_eq!(game.read("parsed_items.txt"), "\nleaders:\n\nministers:\n\nadvisors:\n\nmisc:\nfoo.png\n");
        assert!(game.read("unresolved_items.txt").ends_with("\nmisc:\nfoo.png\n"));
    }

    #[tokio::test]
    async fn test_missing_characters_directory() {
        let game = GameDir::new();
        game.mkdir(PRIMARY);
        game.mkdir(SECONDARY);

        let metrics = reconcile_portraits(&game.config, &game.mods(&[])).await.unwrap();

        assert_eq!(metrics.assets.required, 0);
        assert_eq!(
            game.read("parsed_items.txt"),
            "\nleaders:\n\nministers:\n\nadvisors:\n\nmisc:\n"
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_run_all_merges_workflows() {
        let game = latvia();
        game.add(PRIMARY, "gfx/leaders/MEX/Portrait_MEX_Nobody.dds", "primary");

        let engine = ReconcileEngine::new(&game.config).unwrap();
        let metrics = engine.run_all(&game.mods(&[])).await.unwrap();

        assert_eq!(metrics.assets.required, 4);
        let unresolved = game.read("unresolved_items.txt");
        assert!(unresolved.contains("gfx/leaders/MEX/Portrait_MEX_Nobody.dds"));
        assert!(unresolved.contains("gfx/interface/ideas/karlis_ulmanis.dds"));
    }
}
