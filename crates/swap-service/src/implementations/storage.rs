use swap_config::{StorageBackend, StorageConfig};
use swap_storage::implementations::{file, memory};
use swap_storage::StorageInterface;

pub fn create(config: &StorageConfig) -> Result<Box<dyn StorageInterface>, String> {
	match config.backend {
		StorageBackend::Memory => Ok(memory::create_storage()),
		StorageBackend::File => {
			let path = config
				.path
				.clone()
				.ok_or_else(|| "File storage requires storage.path".to_string())?;
			Ok(file::create_storage(path))
		}
	}
}
