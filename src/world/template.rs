use crate::entities::archetype::Archetype;
use crate::entities::object::{Object, ObjectId};
use crate::error::{CoreError, CoreResult};
use crate::telemetry::logging;
use crate::world::idmap::IdMap;
use crate::world::map::Map;
use crate::world::position::Position;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TilePlacement {
    pub position: Position,
    #[serde(default)]
    pub archetypes: Vec<String>,
    #[serde(default)]
    pub brightness: Option<u8>,
}

/// Layout a map is built from on first load.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MapTemplate {
    pub name: String,
    pub height: u16,
    pub width: u16,
    pub depth: u16,
    #[serde(default = "origin")]
    pub spawn: Position,
    #[serde(default)]
    pub should_sleep: bool,
    #[serde(default)]
    pub should_expire: bool,
    #[serde(default)]
    pub tiles: Vec<TilePlacement>,
}

fn origin() -> Position {
    Position::new(0, 0, 0)
}

/// Lookup contract for archetype and map templates.
pub trait TemplateSource: Send + Sync {
    fn archetype(&self, name: &str) -> CoreResult<Arc<Archetype>>;

    fn map_template(&self, name: &str) -> CoreResult<Arc<MapTemplate>>;

    fn create_object(&self, id: ObjectId, name: &str) -> CoreResult<Object> {
        Ok(Object::from_archetype(id, self.archetype(name)?))
    }
}

#[derive(Debug, Default)]
pub struct TemplateIndex {
    archetypes: HashMap<String, Arc<Archetype>>,
    maps: HashMap<String, Arc<MapTemplate>>,
}

impl TemplateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_archetype(&mut self, archetype: Archetype) {
        self.archetypes
            .insert(archetype.name.clone(), Arc::new(archetype));
    }

    pub fn insert_map(&mut self, template: MapTemplate) {
        self.maps.insert(template.name.clone(), Arc::new(template));
    }

    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    pub fn map_count(&self) -> usize {
        self.maps.len()
    }

    /// Reads `archetypes/*.yaml` (each a list of archetypes) and
    /// `maps/*.yaml` (one map each) under `root`. Missing directories are
    /// treated as empty.
    pub fn load(root: &Path) -> CoreResult<Self> {
        let mut index = Self::new();
        for path in yaml_files(&root.join("archetypes"))? {
            let archetypes: Vec<Archetype> = read_yaml(&path)?;
            for archetype in archetypes {
                if index.archetypes.contains_key(&archetype.name) {
                    logging::log_error(&format!(
                        "duplicate archetype {} in {}, keeping the first",
                        archetype.name,
                        path.display()
                    ));
                    continue;
                }
                index.insert_archetype(archetype);
            }
        }
        for path in yaml_files(&root.join("maps"))? {
            let template: MapTemplate = read_yaml(&path)?;
            index.insert_map(template);
        }
        logging::log_game(&format!(
            "templates loaded: archetypes={}, maps={}",
            index.archetype_count(),
            index.map_count()
        ));
        Ok(index)
    }
}

impl TemplateSource for TemplateIndex {
    fn archetype(&self, name: &str) -> CoreResult<Arc<Archetype>> {
        self.archetypes
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::UnknownArchetype(name.to_string()))
    }

    fn map_template(&self, name: &str) -> CoreResult<Arc<MapTemplate>> {
        self.maps
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::UnknownMap(name.to_string()))
    }
}

fn yaml_files(dir: &Path) -> CoreResult<Vec<std::path::PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(dir).map_err(|err| {
        CoreError::Template(format!("failed to read {}: {}", dir.display(), err))
    })?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry
            .map_err(|err| CoreError::Template(format!("failed to read dir entry: {}", err)))?;
        let path = entry.path();
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        if path.is_file() && (ext == "yaml" || ext == "yml") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> CoreResult<T> {
    let contents = fs::read_to_string(path)
        .map_err(|err| CoreError::Template(format!("failed to read {}: {}", path.display(), err)))?;
    serde_yaml::from_str(&contents)
        .map_err(|err| CoreError::Template(format!("failed to parse {}: {}", path.display(), err)))
}

/// Builds a live map from its template, taking ids from `ids`. On failure
/// every id taken so far is returned.
pub fn instantiate(
    template: &MapTemplate,
    source: &dyn TemplateSource,
    ids: &mut IdMap,
) -> CoreResult<Map> {
    let mut map = Map::new(
        template.name.clone(),
        template.height,
        template.width,
        template.depth,
    );
    map.set_spawn(template.spawn);
    map.should_sleep = template.should_sleep;
    map.should_expire = template.should_expire;

    let mut taken = Vec::new();
    let result = populate(&mut map, template, source, ids, &mut taken);
    if let Err(err) = result {
        ids.free_all(taken);
        return Err(err);
    }
    Ok(map)
}

fn populate(
    map: &mut Map,
    template: &MapTemplate,
    source: &dyn TemplateSource,
    ids: &mut IdMap,
    taken: &mut Vec<ObjectId>,
) -> CoreResult<()> {
    for placement in &template.tiles {
        if let Some(brightness) = placement.brightness {
            map.set_brightness(placement.position, brightness)?;
        }
        for name in &placement.archetypes {
            let id = ids.acquire()?;
            taken.push(id);
            let object = source.create_object(id, name)?;
            map.add_object(object);
            map.place_object(id, placement.position)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::archetype::ObjectType;

    const ARCHETYPES: &str = r#"
- name: stone
  type: block
  matter: [solid]
  blocking: [solid]
- name: hero
  type: character
  health: 20
  capacity: 10
"#;

    const MEADOW: &str = r#"
name: meadow
height: 2
width: 3
depth: 3
spawn: { y: 1, x: 1, z: 1 }
should_sleep: true
tiles:
  - position: { y: 0, x: 0, z: 0 }
    archetypes: [stone, stone]
  - position: { y: 0, x: 1, z: 1 }
    archetypes: [stone]
    brightness: 200
"#;

    fn write_pack() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("archetypes")).expect("mkdir");
        fs::create_dir_all(dir.path().join("maps")).expect("mkdir");
        fs::write(dir.path().join("archetypes/core.yaml"), ARCHETYPES).expect("write");
        fs::write(dir.path().join("maps/meadow.yaml"), MEADOW).expect("write");
        fs::write(dir.path().join("maps/notes.txt"), "ignored").expect("write");
        dir
    }

    #[test]
    fn loads_yaml_pack() {
        let dir = write_pack();
        let index = TemplateIndex::load(dir.path()).expect("load");
        assert_eq!(index.archetype_count(), 2);
        assert_eq!(index.map_count(), 1);
        assert_eq!(
            index.archetype("hero").expect("hero").kind,
            ObjectType::Character
        );
        assert_eq!(
            index.archetype("dragon").err(),
            Some(CoreError::UnknownArchetype("dragon".to_string()))
        );
    }

    #[test]
    fn instantiates_map_from_template() {
        let dir = write_pack();
        let index = TemplateIndex::load(dir.path()).expect("load");
        let template = index.map_template("meadow").expect("meadow");
        let mut ids = IdMap::new();
        let map = instantiate(&template, &index, &mut ids).expect("map");
        assert_eq!(map.object_count(), 3);
        assert_eq!(ids.live_count(), 3);
        assert_eq!(map.spawn(), Position::new(1, 1, 1));
        assert!(map.should_sleep);
        assert_eq!(map.objects_at(Position::new(0, 0, 0)).count(), 2);
        assert_eq!(
            map.tile(Position::new(0, 1, 1)).map(|tile| tile.brightness),
            Some(200)
        );
    }

    #[test]
    fn failed_instantiation_returns_ids() {
        let mut index = TemplateIndex::new();
        index.insert_archetype(Archetype::new("stone", ObjectType::Block));
        index.insert_map(MapTemplate {
            name: "broken".to_string(),
            height: 1,
            width: 1,
            depth: 1,
            spawn: origin(),
            should_sleep: false,
            should_expire: false,
            tiles: vec![TilePlacement {
                position: Position::new(0, 0, 0),
                archetypes: vec!["stone".to_string(), "ghost".to_string()],
                brightness: None,
            }],
        });
        let template = index.map_template("broken").expect("template");
        let mut ids = IdMap::new();
        let err = instantiate(&template, &index, &mut ids).expect_err("unknown archetype");
        assert_eq!(err, CoreError::UnknownArchetype("ghost".to_string()));
        assert_eq!(ids.live_count(), 0);
    }
}
