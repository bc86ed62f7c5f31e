use tilecraft_runtime::{RuntimeMap, SpriteRegistry, TileKind};

const CRASH_SITE: &str = r#"{
  "mapWidth": 12,
  "mapHeight": 10,
  "tileSize": 32,
  "tiles": {
    "0,0": "sand",
    "1,0": "water1",
    "2,0": "rock",
    "0,1": "palm_tree",
    "11,9": "fence"
  },
  "metadata": {
    "name": "Crash Site",
    "description": "Where the plane went down",
    "created": 1700000000000,
    "modified": 1700000000000
  },
  "entityLayers": [
    {
      "name": "Entities",
      "entities": [
        {
          "definitionId": "player_spawn",
          "x": 64.0,
          "y": 96.0,
          "width": 16.0,
          "height": 16.0,
          "fields": {
            "facing_direction": { "type": "enum", "value": "left" }
          }
        }
      ]
    }
  ]
}"#;

#[test]
fn test_load_exported_level() {
    let map = RuntimeMap::from_json(CRASH_SITE, &SpriteRegistry::builtin()).unwrap();
    assert_eq!(map.name, "Crash Site");
    assert_eq!(map.tiles.len(), 4);
    assert_eq!(map.skipped, vec!["palm_tree".to_string()]);

    let kinds: Vec<TileKind> = map.colliders.iter().map(|c| c.kind).collect();
    assert_eq!(kinds, vec![TileKind::Water, TileKind::Object, TileKind::Object]);
    assert!(map.is_blocked(11.0 * 32.0 + 4.0, 9.0 * 32.0 + 4.0));

    let player = map.player_spawn().unwrap();
    assert_eq!((player.x, player.y), (64.0, 96.0));
}

#[test]
fn test_tiles_only_export() {
    let json = r#"{"mapWidth":10,"mapHeight":10,"tileSize":16,"tiles":{"9,9":"grass"},
        "metadata":{"name":"Tiny","description":"","created":0,"modified":0}}"#;
    let map = RuntimeMap::from_json(json, &SpriteRegistry::builtin()).unwrap();
    assert_eq!(map.tiles.len(), 1);
    assert!(map.colliders.is_empty());
    assert!(map.player_spawn().is_none());
}

#[test]
fn test_rejects_out_of_bounds_tiles() {
    let json = r#"{"mapWidth":10,"mapHeight":10,"tileSize":16,"tiles":{"10,0":"grass"},
        "metadata":{"name":"Broken","description":"","created":0,"modified":0}}"#;
    assert!(RuntimeMap::from_json(json, &SpriteRegistry::builtin()).is_err());
}
